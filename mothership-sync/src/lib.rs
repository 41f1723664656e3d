//! # Mothership Sync
//!
//! Debounced autosave between the studio's settings panels and the
//! Mothership config backend. Local edits apply immediately; each section
//! writes itself back after input goes quiet.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                     Settings panels (UI / shell)                      │
//! │      store.set("volume", 0.8)        store.value() / status()         │
//! └──────────────┬───────────────────────────────────────┬────────────────┘
//!                │ synchronous local update              │
//!                ▼                                       │
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │  FieldStore (one per section)                                         │
//! │   local: Value     ledger: PendingEdits     status: {path → state}    │
//! │   Debouncer: key → timer        LoadGate: closed until first load     │
//! └──────────────┬────────────────────────────────────────────────────────┘
//!                │ timer fires (500ms / 1000ms / immediate)
//!                ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │  SyncClient ── put / post / fetch_patch_replace                       │
//! │      │                                                                │
//! │      ▼                                                                │
//! │  ConfigTransport (HttpTransport | RecordingTransport)                 │
//! └──────────────┬────────────────────────────────────────────────────────┘
//!                │ success / failure
//!                ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │  NotificationCenter: capped queue of self-expiring messages           │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Components
//!
//! - [`ConfigLoader`] - fetches the config and memory documents once and
//!   opens the [`LoadGate`]
//! - [`FieldStore`] - local section state, pending-edit ledger and autosave
//! - [`Debouncer`] - keyed cancel-then-arm timers
//! - [`patch`] - leaf updates that preserve siblings, edit coalescing
//! - [`SyncClient`] - one request per call, no retry
//! - [`NotificationCenter`] - user-facing success/failure messages
//! - [`schema`] - typed view of the config document, checked at load
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use mothership_sync::{ConfigLoader, FieldStore, HttpTransport, NotificationCenter,
//!     Section, SyncClient, TransportConfig};
//! use std::sync::Arc;
//!
//! let transport = Arc::new(HttpTransport::new(&TransportConfig::default())?);
//! let client = SyncClient::new(transport);
//! let notifications = NotificationCenter::default();
//!
//! let loader = ConfigLoader::new(client.clone(), notifications.clone());
//! let music = FieldStore::new(Section::Music, client, notifications, loader.gate());
//!
//! let loaded = loader.load().await?;
//! music.hydrate(&loaded.raw);
//! music.set_str("volume", serde_json::json!(0.8))?; // saved ~1s later
//! ```

pub mod client;
pub mod debounce;
pub mod error;
pub mod loader;
pub mod mock;
pub mod notify;
pub mod patch;
pub mod path;
pub mod schema;
pub mod store;
pub mod transport;

pub use client::SyncClient;
pub use debounce::{Debouncer, FIELD_DELAY, GROUP_DELAY};
pub use error::{SyncError, SyncResult};
pub use loader::{ConfigLoader, LoadGate, LoadState, LoadedConfig};
pub use mock::{RecordedRequest, RecordingTransport};
pub use notify::{Notification, NotificationCenter, Severity, DEFAULT_NOTIFICATION_CAP, NOTIFICATION_TTL};
pub use patch::{apply_edits, get_at, partial_payload, set_at, PendingEdit, PendingEdits};
pub use path::FieldPath;
pub use schema::{
    decode_lenient, format_start_time, parse_start_time, AudioSettings, CaptionSettings, CaptionStyle,
    ConfigDocument, CreativePrompt, MemoryDocument, MusicSettings, PolishPrompt, PromptCategory, PromptKind,
    StartTime, VoiceSettings, DEFAULT_CLARITY_LEVEL, DEFAULT_CREATIVITY_LEVEL, DEFAULT_PAUSE_FACTOR,
    DEFAULT_STORY_ARC_COUNT,
};
pub use store::{truncate_title, FieldStatus, FieldStore, SaveReport, SaveRoute, Section};
pub use transport::{ConfigTransport, Endpoint, HttpTransport, TransportConfig, DEFAULT_API_BASE};

/// Re-exported so callers can name request methods without depending on reqwest
pub use reqwest::Method;
