//! Error types for the sync layer

use thiserror::Error;

/// Errors raised while loading, patching, or saving configuration
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned HTTP {status}")]
    Status { status: u16, endpoint: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config document does not match the expected schema: {0}")]
    Schema(String),

    #[error("Invalid field path: {0:?}")]
    InvalidPath(String),

    #[error("Cannot write {path}: segment {segment:?} holds a non-object value")]
    PathConflict { path: String, segment: String },

    #[error("{0}")]
    Validation(String),

    #[error("Configuration has not been loaded")]
    NotLoaded,

    #[error("{0}")]
    Backend(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl SyncError {
    /// Message suitable for a user-facing notification.
    ///
    /// Validation and backend errors already carry the text the user should
    /// see; everything else falls back to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            SyncError::Validation(msg) | SyncError::Backend(msg) => msg.clone(),
            _ => fallback.to_string(),
        }
    }

    /// True for errors that never reached the network
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            SyncError::Validation(_)
                | SyncError::InvalidPath(_)
                | SyncError::PathConflict { .. }
                | SyncError::NotLoaded
        )
    }
}

/// Result alias used across the sync layer
pub type SyncResult<T> = Result<T, SyncError>;
