//! Patch builder
//!
//! Turns field-level edits into outgoing payloads:
//! - [`set_at`] replaces exactly one leaf in a deep copy of a document
//! - [`PendingEdits`] coalesces edits per leaf until they are acknowledged
//! - [`partial_payload`] renders only the dirty leaves as a nested object
//! - [`apply_edits`] replays edits on top of a fetched document, which is how
//!   prompt categories are rewritten (see `SyncClient::fetch_patch_replace`)

use crate::error::{SyncError, SyncResult};
use crate::path::FieldPath;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Look up the value addressed by `path`
pub fn get_at<'a>(doc: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(doc, |node, key| node.as_object()?.get(key))
}

/// Return a deep copy of `doc` with the leaf at `path` set to `value`.
///
/// Missing (or null) intermediate nodes become empty objects. Sibling keys at
/// every level are carried over untouched. The input is never aliased.
pub fn set_at(doc: &Value, path: &FieldPath, value: Value) -> SyncResult<Value> {
    let mut copy = doc.clone();
    set_in_place(&mut copy, path, value)?;
    Ok(copy)
}

/// In-place variant of [`set_at`]
pub fn set_in_place(doc: &mut Value, path: &FieldPath, value: Value) -> SyncResult<()> {
    if doc.is_null() {
        *doc = Value::Object(Map::new());
    }

    let (leaf, parents) = match path.segments().split_last() {
        Some(split) => split,
        None => return Err(SyncError::InvalidPath(path.to_string())),
    };

    let mut node = doc;
    for key in parents {
        let map = node.as_object_mut().ok_or_else(|| SyncError::PathConflict {
            path: path.to_string(),
            segment: key.clone(),
        })?;
        let child = map
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if child.is_null() {
            *child = Value::Object(Map::new());
        }
        if !child.is_object() {
            return Err(SyncError::PathConflict {
                path: path.to_string(),
                segment: key.clone(),
            });
        }
        node = child;
    }

    match node.as_object_mut() {
        Some(map) => {
            map.insert(leaf.clone(), value);
            Ok(())
        }
        None => Err(SyncError::PathConflict {
            path: path.to_string(),
            segment: leaf.clone(),
        }),
    }
}

/// One uncommitted local change
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEdit {
    pub path: FieldPath,
    pub value: Value,
    pub edited_at: DateTime<Utc>,
    /// Monotonic per-ledger sequence number; later edits have larger values
    pub seq: u64,
}

/// Coalescing ledger of edits that the backend has not acknowledged yet
#[derive(Debug, Default, Clone)]
pub struct PendingEdits {
    edits: BTreeMap<FieldPath, PendingEdit>,
    next_seq: u64,
}

impl PendingEdits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edit, replacing any earlier edit to the same leaf.
    ///
    /// Edits below `path` are dropped since this edit replaces their subtree.
    pub fn record(&mut self, path: FieldPath, value: Value) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.edits
            .retain(|existing, _| existing == &path || !path.is_prefix_of(existing));
        self.edits.insert(
            path.clone(),
            PendingEdit {
                path,
                value,
                edited_at: Utc::now(),
                seq,
            },
        );
        seq
    }

    /// All pending edits in the order they were made
    pub fn snapshot(&self) -> Vec<PendingEdit> {
        let mut edits: Vec<PendingEdit> = self.edits.values().cloned().collect();
        edits.sort_by_key(|e| e.seq);
        edits
    }

    /// Pending edits under `prefix`, re-rooted relative to it
    pub fn under(&self, prefix: &FieldPath) -> Vec<PendingEdit> {
        self.snapshot()
            .into_iter()
            .filter_map(|edit| {
                let rel = edit.path.strip_prefix(prefix)?;
                Some(PendingEdit { path: rel, ..edit })
            })
            .collect()
    }

    /// Drop edits the backend accepted.
    ///
    /// An entry is only removed if it has not been edited again since it was
    /// sent; a newer edit stays pending. Returns the paths that were settled.
    pub fn settle(&mut self, sent: &[(FieldPath, u64)]) -> Vec<FieldPath> {
        let mut settled = Vec::new();
        for (path, seq) in sent {
            if self.edits.get(path).map(|e| e.seq) == Some(*seq) {
                self.edits.remove(path);
                settled.push(path.clone());
            }
        }
        settled
    }

    /// Latest sequence number recorded for `path`, if still pending
    pub fn seq_of(&self, path: &FieldPath) -> Option<u64> {
        self.edits.get(path).map(|e| e.seq)
    }

    pub fn contains(&self, path: &FieldPath) -> bool {
        self.edits.contains_key(path)
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn clear(&mut self) {
        self.edits.clear();
    }
}

/// Replay `edits` (in sequence order) over a deep copy of `base`
pub fn apply_edits(base: &Value, edits: &[PendingEdit]) -> SyncResult<Value> {
    let mut doc = base.clone();
    let mut ordered: Vec<&PendingEdit> = edits.iter().collect();
    ordered.sort_by_key(|e| e.seq);
    for edit in ordered {
        set_in_place(&mut doc, &edit.path, edit.value.clone())?;
    }
    Ok(doc)
}

/// Nested object containing only the edited leaves
pub fn partial_payload(edits: &[PendingEdit]) -> SyncResult<Value> {
    apply_edits(&Value::Object(Map::new()), edits)
}
