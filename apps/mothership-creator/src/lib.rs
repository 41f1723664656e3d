//! Mothership Creator - settings and submission for the content studio
//!
//! This app provides:
//! - Voice, music, captions, pause factor and prompt panels that autosave
//!   to the config backend after edits go quiet
//! - The creator form: validation, `/api/process` submission and restoring
//!   the last submitted text
//! - UI events (overlays, selection banner, memory availability) on a
//!   bounded channel
//!
//! **Note**: Nothing is written to the backend until the first config load
//! succeeds.

pub mod events;
pub mod panels;
pub mod session;
pub mod submission;

pub use session::{CreatorSession, SavedContent};

// Re-export event types
pub use events::{CreatorEvent, EventSink, OverlayState, SELECTION_BANNER_TTL};

// Re-export panel types
pub use panels::{
    available_videos, extract_youtube_id, CaptionsPanel, MusicPanel, PauseFactorPanel,
    PromptsPanel, TrackSource, VoiceChoice, VoicePanel, DEFAULT_CATEGORY, MUSIC_TRACK_IDS,
};

// Re-export submission types
pub use submission::{
    MemoryField, ProcessResponse, SubmissionForm, Submitter, VideoFormat, GENRES,
};

/// App identifier used in logs and the shell banner
pub const APP_ID: &str = "mothership-creator";
pub const APP_NAME: &str = "Mothership Creator";
