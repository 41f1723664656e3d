//! Background music panel
//!
//! Browses a fixed carousel of YouTube tracks or accepts a custom URL.
//! Changes to track, start time, trim and volume are grouped and written
//! to `/api/config/music` one second after the last edit.

use mothership_sync::{
    format_start_time, parse_start_time, FieldStore, MusicSettings, NotificationCenter, SyncError,
    SyncResult,
};
use parking_lot::Mutex;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

/// Preset tracks shown in the carousel
pub const MUSIC_TRACK_IDS: [&str; 23] = [
    "F0cdbR5ognY",
    "NEnephbahLA",
    "fk4BbF7B29w",
    "Lrle0x_DHBM",
    "RSW8qYXyfRQ",
    "X8LUd51IuiA",
    "zUzyX34I7FM",
    "cbHkzwa0QmM",
    "wJUbXZc-etA",
    "0dT9siTP70Y",
    "U8F5G5wR1mk",
    "H58vbez_m4E",
    "BDHM8cyJQa8",
    "w1cUk-jt8go",
    "F5MKvQ3IDNs",
    "aMYxkySU8Lc",
    "2KsrI8PiShw",
    "7qqUiKPfV2Y",
    "WQR8fbPFJ9E",
    "kPa7bsKwL-c",
    "NHFq31K5_XY",
    "Cv6tuzHUuuk",
    "6ib9lk9gvGY",
];

/// Length of a YouTube video id
pub const YOUTUBE_ID_LEN: usize = 11;

/// Title used when a custom track has none
pub const CUSTOM_TRACK_TITLE: &str = "Custom YouTube Track";

/// Upper bound of the trim slider, in seconds
pub const MAX_TRIM_AUDIO: f64 = 60.0;

fn youtube_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*")
                .map_err(|e| ::log::error!("Invalid YouTube pattern: {}", e))
                .ok()
        })
        .as_ref()
}

/// Extract the video id from any common YouTube URL form
pub fn extract_youtube_id(url: &str) -> Option<String> {
    let captures = youtube_pattern()?.captures(url.trim())?;
    let id = captures.get(2)?.as_str();
    (id.len() == YOUTUBE_ID_LEN).then(|| id.to_string())
}

/// Currently selected source
#[derive(Debug, Clone, PartialEq)]
pub enum TrackSource {
    Preset { index: usize },
    Custom { id: String, title: String },
}

pub struct MusicPanel {
    store: FieldStore,
    notifications: NotificationCenter,
    carousel: Mutex<usize>,
}

impl MusicPanel {
    pub fn new(store: FieldStore, notifications: NotificationCenter) -> Self {
        let panel = Self {
            store,
            notifications,
            carousel: Mutex::new(0),
        };
        panel.sync_carousel();
        panel
    }

    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    /// Point the carousel at the stored track if it is one of the presets
    pub fn sync_carousel(&self) {
        if let TrackSource::Preset { index } = self.source() {
            *self.carousel.lock() = index;
        }
    }

    pub fn settings(&self) -> MusicSettings {
        self.store.typed().unwrap_or_default()
    }

    pub fn source(&self) -> TrackSource {
        let settings = self.settings();
        match MUSIC_TRACK_IDS.iter().position(|id| *id == settings.track_id) {
            Some(index) => TrackSource::Preset { index },
            None => TrackSource::Custom {
                title: settings
                    .custom_title
                    .unwrap_or_else(|| CUSTOM_TRACK_TITLE.to_string()),
                id: settings.track_id,
            },
        }
    }

    /// Track under the carousel cursor (not necessarily selected)
    pub fn browsed_track(&self) -> &'static str {
        MUSIC_TRACK_IDS[*self.carousel.lock() % MUSIC_TRACK_IDS.len()]
    }

    pub fn next_track(&self) -> &'static str {
        let mut index = self.carousel.lock();
        *index = (*index + 1) % MUSIC_TRACK_IDS.len();
        MUSIC_TRACK_IDS[*index]
    }

    pub fn prev_track(&self) -> &'static str {
        let mut index = self.carousel.lock();
        *index = if *index == 0 { MUSIC_TRACK_IDS.len() - 1 } else { *index - 1 };
        MUSIC_TRACK_IDS[*index]
    }

    /// Select the track under the carousel cursor
    pub fn select_browsed_track(&self) -> SyncResult<()> {
        let track_id = self.browsed_track();
        self.store.set_str("track_id", json!(track_id))?;
        self.store.set_str("custom_title", Value::Null)
    }

    /// Select a track from a pasted URL
    pub fn select_custom_url(&self, url: &str, title: Option<&str>) -> SyncResult<String> {
        let Some(track_id) = extract_youtube_id(url) else {
            let message = "Please enter a valid YouTube URL";
            self.notifications.error(message);
            return Err(SyncError::Validation(message.to_string()));
        };
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(CUSTOM_TRACK_TITLE);

        ::log::info!("Custom music track {} ({})", track_id, title);
        self.store.set_str("track_id", json!(track_id))?;
        self.store.set_str("custom_title", json!(title))?;
        Ok(track_id)
    }

    /// Accepts `"M:SS"`; stored as seconds
    pub fn set_start_time(&self, text: &str) -> SyncResult<u64> {
        let seconds = parse_start_time(text);
        self.store.set_str("start_time", json!(seconds))?;
        Ok(seconds)
    }

    pub fn start_time_display(&self) -> String {
        let settings = self.settings();
        let display = settings.start_time.display();
        if display.is_empty() {
            format_start_time(0)
        } else {
            display
        }
    }

    pub fn set_volume(&self, volume: f64) -> SyncResult<()> {
        self.store.set_str("volume", json!(volume.clamp(0.0, 1.0)))
    }

    pub fn set_trim_audio(&self, seconds: f64) -> SyncResult<()> {
        self.store.set_str("trim_audio", json!(seconds.clamp(0.0, MAX_TRIM_AUDIO)))
    }
}
