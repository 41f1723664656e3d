//! Config loader
//!
//! Fetches the authoritative config document and the memory document once,
//! then opens the [`LoadGate`]. Field stores refuse to write while the gate is
//! closed, so defaults shown before the document arrives can never overwrite
//! the real remote values. A failed load leaves the gate closed for good.

use crate::client::SyncClient;
use crate::error::{SyncError, SyncResult};
use crate::notify::{NotificationCenter, Severity};
use crate::schema::{ConfigDocument, MemoryDocument};
use crate::transport::Endpoint;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared "config has loaded" flag
#[derive(Debug, Clone, Default)]
pub struct LoadGate {
    loaded: Arc<AtomicBool>,
}

impl LoadGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Normally done by [`ConfigLoader::load`]
    pub fn open(&self) {
        self.loaded.store(true, Ordering::Release);
    }
}

/// Loader lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    /// Panels show a persistent "could not load" state
    Failed { message: String },
}

impl Default for LoadState {
    fn default() -> Self {
        LoadState::Idle
    }
}

/// Result of a successful load
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Document exactly as served
    pub raw: Value,
    /// Validated view of `raw`
    pub typed: ConfigDocument,
    pub memory: MemoryDocument,
}

pub struct ConfigLoader {
    client: SyncClient,
    notifications: NotificationCenter,
    gate: LoadGate,
    state: Arc<RwLock<LoadState>>,
    snapshot: Arc<RwLock<Option<LoadedConfig>>>,
}

impl ConfigLoader {
    pub fn new(client: SyncClient, notifications: NotificationCenter) -> Self {
        Self {
            client,
            notifications,
            gate: LoadGate::new(),
            state: Arc::new(RwLock::new(LoadState::Idle)),
            snapshot: Arc::new(RwLock::new(None)),
        }
    }

    pub fn gate(&self) -> LoadGate {
        self.gate.clone()
    }

    pub fn state(&self) -> LoadState {
        self.state.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.gate.is_open()
    }

    /// Last successfully loaded documents
    pub fn snapshot(&self) -> Option<LoadedConfig> {
        self.snapshot.read().clone()
    }

    /// Fetch both documents. No retry on failure.
    pub async fn load(&self) -> SyncResult<LoadedConfig> {
        *self.state.write() = LoadState::Loading;
        info!("Fetching configuration...");

        let (config, memory) = tokio::join!(
            self.client.get(&Endpoint::Config),
            self.client.get(&Endpoint::Memory)
        );

        let memory = match memory.and_then(|raw| MemoryDocument::from_value(&raw)) {
            Ok(memory) => memory,
            Err(e) => {
                warn!("Error checking for saved content: {}", e);
                self.notifications
                    .push("Could not check for saved content", Severity::Warning);
                MemoryDocument::default()
            }
        };

        let loaded = config.and_then(|raw| {
            let typed = ConfigDocument::from_value(&raw)?;
            Ok(LoadedConfig { raw, typed, memory })
        });

        match loaded {
            Ok(loaded) => {
                *self.snapshot.write() = Some(loaded.clone());
                *self.state.write() = LoadState::Loaded;
                self.gate.open();
                info!("Configuration loaded successfully");
                Ok(loaded)
            }
            Err(e) => {
                error!("Error fetching configuration: {}", e);
                *self.state.write() = LoadState::Failed {
                    message: e.to_string(),
                };
                self.notifications.error("Failed to load configuration");
                Err(e)
            }
        }
    }

    /// Re-read only the memory document (for "load last ..." actions)
    pub async fn fetch_memory(&self) -> SyncResult<MemoryDocument> {
        let raw = self.client.get(&Endpoint::Memory).await?;
        MemoryDocument::from_value(&raw)
    }

    /// Fail fast if the gate is still closed
    pub fn require_loaded(&self) -> SyncResult<()> {
        if self.gate.is_open() {
            Ok(())
        } else {
            Err(SyncError::NotLoaded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RecordingTransport;
    use serde_json::json;

    fn loader_with(transport: Arc<RecordingTransport>) -> (ConfigLoader, NotificationCenter) {
        let notifications = NotificationCenter::default();
        let loader = ConfigLoader::new(SyncClient::new(transport), notifications.clone());
        (loader, notifications)
    }

    #[tokio::test]
    async fn test_load_opens_gate() {
        let transport = Arc::new(RecordingTransport::new(json!({
            "audio": { "pause_factor": 0.4 },
            "memory": { "last_mothership": "Hello there" }
        })));
        let (loader, notifications) = loader_with(transport.clone());
        assert!(!loader.is_loaded());

        let loaded = loader.load().await.unwrap();

        assert!(loader.is_loaded());
        assert_eq!(loader.state(), LoadState::Loaded);
        assert_eq!(loaded.typed.audio.pause_factor, 0.4);
        assert_eq!(loaded.memory.mothership(), Some("Hello there"));
        assert!(notifications.is_empty());
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_gate_closed() {
        let transport = Arc::new(RecordingTransport::new(json!({})));
        transport.fail(Endpoint::Config);
        let (loader, notifications) = loader_with(transport.clone());

        assert!(loader.load().await.is_err());

        assert!(!loader.is_loaded());
        assert!(matches!(loader.state(), LoadState::Failed { .. }));
        assert!(matches!(loader.require_loaded(), Err(SyncError::NotLoaded)));
        let visible = notifications.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].message, "Failed to load configuration");
        // No retry
        assert_eq!(transport.requests_to(&reqwest::Method::GET, &Endpoint::Config).len(), 1);
    }

    #[tokio::test]
    async fn test_schema_violation_is_a_load_failure() {
        let transport = Arc::new(RecordingTransport::new(json!({ "captions": { "style": "neon" } })));
        let (loader, _notifications) = loader_with(transport);

        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, SyncError::Schema(_)));
        assert!(!loader.is_loaded());
    }

    #[tokio::test]
    async fn test_sparse_document_loads_with_defaults() {
        let transport = Arc::new(RecordingTransport::new(json!({
            "audio": { "pause_factor": null },
            "music": { "volume": 0.6, "start_time": null },
            "prompts": {
                "military": {
                    "creative": { "story_arc_count": null, "creativity_level": 6.6 },
                    "polish": { "clarity_level": "9" }
                }
            },
            "memory": { "last_prompt": null }
        })));
        let (loader, notifications) = loader_with(transport);

        let loaded = loader.load().await.unwrap();

        assert!(loader.is_loaded());
        assert!(notifications.is_empty());
        let typed = &loaded.typed;
        assert_eq!(typed.audio.pause_factor, crate::schema::DEFAULT_PAUSE_FACTOR);
        assert_eq!(typed.audio.voice, crate::schema::VoiceSettings::default());
        assert_eq!(typed.music.volume, 0.6);
        assert_eq!(typed.music.start_time.seconds(), 0);
        assert_eq!(typed.music.track_id, "Otv8MxIiv80");
        let military = &typed.prompts["military"];
        assert_eq!(military.creative.story_arc_count, crate::schema::DEFAULT_STORY_ARC_COUNT);
        assert_eq!(military.creative.creativity_level, 7);
        assert_eq!(military.polish.clarity_level, 9);
        assert_eq!(loaded.memory.prompt(), None);
    }

    #[tokio::test]
    async fn test_memory_failure_does_not_block_gate() {
        let transport = Arc::new(RecordingTransport::new(json!({})));
        transport.fail(Endpoint::Memory);
        let (loader, notifications) = loader_with(transport);

        let loaded = loader.load().await.unwrap();
        assert!(loader.is_loaded());
        assert_eq!(loaded.memory, MemoryDocument::default());
        assert_eq!(notifications.count(Severity::Warning), 1);
    }
}
