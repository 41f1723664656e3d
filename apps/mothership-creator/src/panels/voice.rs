//! Voice settings panel
//!
//! Edits `audio.voice`. The whole voice object is written to
//! `/api/config/voice` one second after the last change.

use mothership_sync::{FieldStore, SyncResult, VoiceSettings};
use serde_json::json;

/// Selectable preset voices (id, label)
pub const VOICE_PRESETS: [(&str, &str); 5] = [
    ("AvUYKSeryCcU2BHSM8x7", "Default Voice"),
    ("LcfcDJNUP1GQjkzn1xUU", "Professional Male"),
    ("kgG9JYzoq3X4JEzFsieS", "Professional Female"),
    ("ZQe5zn9AaKMFujKjmjbS", "Narrative"),
    ("EOXSTnQ6c4FMBKLUZkQn", "Emotional"),
];

/// TTS models (id, label)
pub const MODEL_OPTIONS: [(&str, &str); 3] = [
    ("eleven_flash_v2", "Flash V2 (Fastest)"),
    ("eleven_multilingual_v2", "Multilingual V2"),
    ("eleven_turbo_v2", "Turbo V2"),
];

/// Audio encodings (id, label)
pub const OUTPUT_FORMAT_OPTIONS: [(&str, &str); 5] = [
    ("mp3_44100_128", "MP3 (44.1kHz, 128kbps)"),
    ("mp3_44100_192", "MP3 (44.1kHz, 192kbps)"),
    ("pcm_16000", "PCM (16kHz)"),
    ("pcm_22050", "PCM (22.05kHz)"),
    ("pcm_24000", "PCM (24kHz)"),
];

/// Which voice source is active
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceChoice {
    Preset(&'static str),
    /// Free-form id; empty until the user types one
    Custom(String),
}

pub struct VoicePanel {
    store: FieldStore,
}

impl VoicePanel {
    pub fn new(store: FieldStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    /// Current settings, falling back to defaults for missing fields
    pub fn settings(&self) -> VoiceSettings {
        self.store.typed().unwrap_or_default()
    }

    pub fn choice(&self) -> VoiceChoice {
        let voice_id = self.settings().voice_id;
        match VOICE_PRESETS.iter().find(|(id, _)| *id == voice_id) {
            Some((id, _)) => VoiceChoice::Preset(id),
            None => VoiceChoice::Custom(voice_id),
        }
    }

    pub fn select_preset(&self, voice_id: &str) -> SyncResult<()> {
        if !VOICE_PRESETS.iter().any(|(id, _)| *id == voice_id) {
            return Err(mothership_sync::SyncError::Validation(format!(
                "Unknown voice preset: {}",
                voice_id
            )));
        }
        self.store.set_str("voice_id", json!(voice_id))
    }

    /// Switch to a custom id. An empty id is kept locally but never saved.
    pub fn set_custom_voice_id(&self, voice_id: &str) -> SyncResult<()> {
        self.store.set_str("voice_id", json!(voice_id.trim()))
    }

    pub fn set_model(&self, model_id: &str) -> SyncResult<()> {
        self.store.set_str("model_id", json!(model_id))
    }

    pub fn set_output_format(&self, format: &str) -> SyncResult<()> {
        self.store.set_str("output_format", json!(format))
    }

    pub fn set_stability(&self, value: f64) -> SyncResult<()> {
        self.store.set_str("stability", json!(value.clamp(0.0, 1.0)))
    }

    pub fn set_similarity_boost(&self, value: f64) -> SyncResult<()> {
        self.store.set_str("similarity_boost", json!(value.clamp(0.0, 1.0)))
    }

    pub fn set_speed(&self, value: f64) -> SyncResult<()> {
        self.store.set_str("speed", json!(value.clamp(0.5, 2.0)))
    }

    pub fn set_speaker_boost(&self, enabled: bool) -> SyncResult<()> {
        self.store.set_str("use_speaker_boost", json!(enabled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panels::test_support::{store, wait};
    use mothership_sync::{Endpoint, Method, Section};

    #[tokio::test(start_paused = true)]
    async fn test_group_edits_coalesce_into_one_put() {
        let (store, transport, _notifications) = store(Section::Voice);
        let panel = VoicePanel::new(store);

        panel.set_speed(1.4).unwrap();
        panel.set_stability(0.9).unwrap();
        panel.set_model("eleven_turbo_v2").unwrap();
        wait(1100).await;

        let puts = transport.requests_to(&Method::PUT, &Endpoint::Voice);
        assert_eq!(puts.len(), 1);
        let body = puts[0].body.clone().unwrap();
        assert_eq!(body["speed"], 1.4);
        assert_eq!(body["stability"], 0.9);
        assert_eq!(body["model_id"], "eleven_turbo_v2");
        assert_eq!(body["output_format"], "mp3_44100_128");
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_voice_requires_id() {
        let (store, transport, _notifications) = store(Section::Voice);
        let panel = VoicePanel::new(store);

        panel.set_custom_voice_id("  ").unwrap();
        assert_eq!(panel.choice(), VoiceChoice::Custom(String::new()));
        wait(1100).await;
        assert_eq!(transport.write_count(), 0);

        panel.set_custom_voice_id("myClonedVoice01").unwrap();
        wait(1100).await;
        assert_eq!(transport.write_count(), 1);
    }

    #[test]
    fn test_speed_is_clamped() {
        let (store, _transport, _notifications) = store(Section::Voice);
        let panel = VoicePanel::new(store);
        panel.set_speed(5.0).unwrap();
        assert_eq!(panel.settings().speed, 2.0);
        assert!(panel.select_preset("nope").is_err());
    }
}
