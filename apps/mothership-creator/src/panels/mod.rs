//! Settings panels
//!
//! Each panel wraps the [`FieldStore`](mothership_sync::FieldStore) for one
//! section and exposes the operations its UI offers.

pub mod captions;
pub mod music;
pub mod pause_factor;
pub mod prompts;
pub mod voice;

pub use captions::CaptionsPanel;
pub use music::{extract_youtube_id, MusicPanel, TrackSource, MUSIC_TRACK_IDS};
pub use pause_factor::PauseFactorPanel;
pub use prompts::{available_videos, PromptsPanel, DEFAULT_CATEGORY};
pub use voice::{VoiceChoice, VoicePanel, MODEL_OPTIONS, OUTPUT_FORMAT_OPTIONS, VOICE_PRESETS};

#[cfg(test)]
pub(crate) mod test_support {
    use mothership_sync::{
        FieldStore, LoadGate, NotificationCenter, RecordingTransport, Section, SyncClient,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    pub fn seeded() -> Value {
        json!({
            "audio": {
                "pause_factor": 0.25,
                "voice": {
                    "voice_id": "AvUYKSeryCcU2BHSM8x7",
                    "model_id": "eleven_flash_v2",
                    "stability": 0.5,
                    "similarity_boost": 0.75,
                    "speed": 1.15,
                    "use_speaker_boost": true,
                    "output_format": "mp3_44100_128"
                }
            },
            "music": { "track_id": "Otv8MxIiv80", "start_time": 0, "trim_audio": 0.0, "volume": 0.2 },
            "captions": { "enabled": false, "style": "default" },
            "prompts": {
                "military": {
                    "creative": {
                        "prompt": "Generate a military-themed video",
                        "story_arc_count": 3,
                        "favorite_videos": ["v1", "v2"]
                    },
                    "polish": { "prompt": "Polish", "specific_commands": ["cut intro"] }
                }
            },
            "video_list": { "military": ["v1", "v2", "v3"] },
            "memory": { "last_mothership": "Saved mothership", "last_prompt": "Saved prompt" }
        })
    }

    /// A document as an older backend writes it: no voice block, a partial
    /// music block and null leaves
    pub fn sparse() -> Value {
        json!({
            "audio": { "pause_factor": 0.3 },
            "music": { "track_id": "abc123def45", "start_time": null },
            "captions": { "enabled": true, "style": null },
            "prompts": {
                "military": {
                    "creative": {
                        "prompt": "Sparse prompt",
                        "story_arc_count": null,
                        "creativity_level": 6.6
                    },
                    "polish": { "clarity_level": null }
                }
            },
            "memory": { "last_mothership": null }
        })
    }

    /// Hydrated store over a seeded in-memory backend, gate already open
    pub fn store(section: Section) -> (FieldStore, Arc<RecordingTransport>, NotificationCenter) {
        store_over(section, seeded())
    }

    pub fn store_over(
        section: Section,
        document: Value,
    ) -> (FieldStore, Arc<RecordingTransport>, NotificationCenter) {
        let transport = Arc::new(RecordingTransport::new(document));
        let notifications = NotificationCenter::default();
        let gate = LoadGate::new();
        gate.open();
        let store = FieldStore::new(
            section,
            SyncClient::new(transport.clone()),
            notifications.clone(),
            gate,
        );
        store.hydrate(&transport.document());
        (store, transport, notifications)
    }

    pub async fn wait(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
