//! Dotted addresses into the config document

use crate::error::{SyncError, SyncResult};
use std::fmt;
use std::str::FromStr;

/// A dotted sequence of keys, e.g. `prompts.military.creative.tone`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path. Empty paths and empty segments are rejected.
    pub fn parse(path: &str) -> SyncResult<Self> {
        if path.is_empty() {
            return Err(SyncError::InvalidPath(path.to_string()));
        }
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(SyncError::InvalidPath(path.to_string()));
        }
        Ok(Self { segments })
    }

    /// Build a path from already-split segments
    pub fn from_segments<I, S>(segments: I) -> SyncResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(|s| s.is_empty() || s.contains('.')) {
            return Err(SyncError::InvalidPath(segments.join(".")));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; a parsed path has at least one segment
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Final key of the path
    pub fn leaf(&self) -> &str {
        // Non-empty by construction
        &self.segments[self.segments.len() - 1]
    }

    /// First key of the path
    pub fn head(&self) -> &str {
        &self.segments[0]
    }

    /// Append `child` (itself possibly dotted) to this path
    pub fn join(&self, child: &FieldPath) -> FieldPath {
        let mut segments = self.segments.clone();
        segments.extend(child.segments.iter().cloned());
        FieldPath { segments }
    }

    /// Path relative to `prefix`, or `None` if `prefix` does not lead here.
    /// Stripping the full path yields `None` as well; a field path is never empty.
    pub fn strip_prefix(&self, prefix: &FieldPath) -> Option<FieldPath> {
        if prefix.segments.len() >= self.segments.len() {
            return None;
        }
        if self.segments[..prefix.segments.len()] != prefix.segments[..] {
            return None;
        }
        Some(FieldPath {
            segments: self.segments[prefix.segments.len()..].to_vec(),
        })
    }

    /// True if `self` equals `other` or is one of its ancestors
    pub fn is_prefix_of(&self, other: &FieldPath) -> bool {
        self.segments.len() <= other.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl FromStr for FieldPath {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::parse(s)
    }
}
