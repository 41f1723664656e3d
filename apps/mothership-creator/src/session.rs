//! Creator session
//!
//! Owns everything one open creator page needs: the loader, one field store
//! per panel, the submission form and the UI event sink. `mount()` loads the
//! config and hydrates the panels; `unmount()` cancels every armed timer.

use crate::events::{CreatorEvent, EventSink, OverlayState};
use crate::panels::{CaptionsPanel, MusicPanel, PauseFactorPanel, PromptsPanel, VoicePanel};
use crate::submission::{MemoryField, ProcessResponse, SubmissionForm, Submitter};
use crossbeam_channel::Receiver;
use mothership_sync::{
    ConfigLoader, ConfigTransport, FieldPath, FieldStore, LoadState, NotificationCenter, SaveReport,
    Section, SyncClient, SyncError, SyncResult,
};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Whether the memory document holds text to restore
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SavedContent {
    pub mothership: bool,
    pub prompt: bool,
}

pub struct CreatorSession {
    client: SyncClient,
    notifications: NotificationCenter,
    events: EventSink,
    loader: ConfigLoader,
    submitter: Submitter,
    pub voice: VoicePanel,
    pub music: MusicPanel,
    pub captions: CaptionsPanel,
    pub pause_factor: PauseFactorPanel,
    pub prompts: PromptsPanel,
    /// `/api/config/value` stores, keyed by top-level section name
    values: Mutex<HashMap<String, FieldStore>>,
    form: RwLock<SubmissionForm>,
    saved: RwLock<SavedContent>,
}

impl CreatorSession {
    pub fn new(transport: Arc<dyn ConfigTransport>, notification_cap: usize) -> Self {
        let client = SyncClient::new(transport);
        let notifications = NotificationCenter::new(notification_cap);
        let events = EventSink::new();
        let loader = ConfigLoader::new(client.clone(), notifications.clone());

        let store = |section: Section| {
            FieldStore::new(section, client.clone(), notifications.clone(), loader.gate())
        };

        Self {
            voice: VoicePanel::new(store(Section::Voice)),
            music: MusicPanel::new(store(Section::Music), notifications.clone()),
            captions: CaptionsPanel::new(store(Section::Captions)),
            pause_factor: PauseFactorPanel::new(store(Section::PauseFactor)),
            prompts: PromptsPanel::new(store(Section::Prompts)),
            submitter: Submitter::new(client.clone(), notifications.clone(), events.clone()),
            values: Mutex::new(HashMap::new()),
            form: RwLock::new(SubmissionForm::default()),
            saved: RwLock::new(SavedContent::default()),
            client,
            notifications,
            events,
            loader,
        }
    }

    /// Load the config and hydrate every panel
    pub async fn mount(&self) -> SyncResult<()> {
        let loaded = match self.loader.load().await {
            Ok(loaded) => loaded,
            Err(e) => {
                self.events.emit(CreatorEvent::ConfigLoadFailed {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        for store in self.stores() {
            store.hydrate(&loaded.raw);
        }
        self.music.sync_carousel();

        let saved = SavedContent {
            mothership: loaded.memory.mothership().is_some(),
            prompt: loaded.memory.prompt().is_some(),
        };
        *self.saved.write() = saved;

        ::log::info!(
            "Creator session mounted ({} prompt categories)",
            loaded.typed.prompts.len()
        );
        self.events.emit(CreatorEvent::ConfigLoaded);
        self.events.emit(CreatorEvent::MemoryAvailability {
            mothership: saved.mothership,
            prompt: saved.prompt,
        });
        Ok(())
    }

    /// Cancel all armed autosaves and banner timers
    pub fn unmount(&self) -> usize {
        let cancelled: usize = self.stores().iter().map(|s| s.unmount()).sum();
        self.events.shutdown();
        if cancelled > 0 {
            ::log::info!("Unmount cancelled {} pending autosave(s)", cancelled);
        }
        cancelled
    }

    /// Save everything pending right now
    pub async fn flush_all(&self) -> SaveReport {
        let mut total = SaveReport::default();
        for store in self.stores() {
            let report = store.flush().await;
            total.saved += report.saved;
            total.failed += report.failed;
            total.skipped |= report.skipped;
        }
        total
    }

    fn stores(&self) -> Vec<FieldStore> {
        let mut stores = vec![
            self.voice.store().clone(),
            self.music.store().clone(),
            self.captions.store().clone(),
            self.pause_factor.store().clone(),
            self.prompts.store().clone(),
        ];
        stores.extend(self.values.lock().values().cloned());
        stores
    }

    /// Store backing `section`, creating value stores on first use
    pub fn store_for(&self, section: &Section) -> FieldStore {
        match section {
            Section::Voice => self.voice.store().clone(),
            Section::Music => self.music.store().clone(),
            Section::Captions => self.captions.store().clone(),
            Section::PauseFactor => self.pause_factor.store().clone(),
            Section::Prompts => self.prompts.store().clone(),
            Section::Value(root) => {
                let mut values = self.values.lock();
                values
                    .entry(root.to_string())
                    .or_insert_with(|| {
                        let store = FieldStore::new(
                            section.clone(),
                            self.client.clone(),
                            self.notifications.clone(),
                            self.loader.gate(),
                        );
                        if let Some(loaded) = self.loader.snapshot() {
                            store.hydrate(&loaded.raw);
                        }
                        store
                    })
                    .clone()
            }
        }
    }

    /// Edit any document path through `/api/config/value`
    pub fn set_value(&self, path: &str, value: Value) -> SyncResult<()> {
        let path = FieldPath::parse(path)?;
        let root = FieldPath::from_segments([path.head()])?;
        let relative = path
            .strip_prefix(&root)
            .ok_or_else(|| SyncError::InvalidPath(format!("{} names a whole section", path)))?;
        self.store_for(&Section::Value(root)).set(&relative, value)
    }

    pub fn has_unsaved(&self) -> bool {
        self.stores().iter().any(|s| s.has_unsaved())
    }

    pub fn load_state(&self) -> LoadState {
        self.loader.state()
    }

    pub fn is_loaded(&self) -> bool {
        self.loader.is_loaded()
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    /// Events from now on; replaces any earlier subscriber
    pub fn subscribe(&self) -> Receiver<CreatorEvent> {
        self.events.subscribe()
    }

    pub fn overlay(&self) -> OverlayState {
        self.events.overlay()
    }

    pub fn show_selection_banner(&self) {
        self.events.show_selection_banner();
    }

    pub fn dismiss_success(&self) {
        self.events.dismiss_success();
    }

    pub fn saved_content(&self) -> SavedContent {
        *self.saved.read()
    }

    pub fn form(&self) -> SubmissionForm {
        self.form.read().clone()
    }

    pub fn update_form(&self, update: impl FnOnce(&mut SubmissionForm)) {
        update(&mut self.form.write());
    }

    pub async fn submit(&self) -> SyncResult<ProcessResponse> {
        let form = self.form();
        let response = self.submitter.handle_submit(&form).await?;
        *self.saved.write() = SavedContent {
            mothership: true,
            prompt: true,
        };
        Ok(response)
    }

    /// Restore the remembered text for `field` into the form
    pub async fn load_last(&self, field: MemoryField) -> SyncResult<String> {
        let text = self.submitter.load_last(field).await?;
        self.update_form(|form| match field {
            MemoryField::Mothership => form.mothership = text.clone(),
            MemoryField::Prompt => form.prompt = text.clone(),
        });
        Ok(text)
    }
}

impl Drop for CreatorSession {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panels::test_support::{seeded, sparse, wait};
    use mothership_sync::{Endpoint, Method, RecordingTransport, DEFAULT_NOTIFICATION_CAP};
    use serde_json::json;

    fn session(transport: &Arc<RecordingTransport>) -> CreatorSession {
        CreatorSession::new(transport.clone(), DEFAULT_NOTIFICATION_CAP)
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_hydrates_panels() {
        let transport = Arc::new(RecordingTransport::new(seeded()));
        let session = session(&transport);
        let rx = session.subscribe();

        session.mount().await.unwrap();

        assert_eq!(session.pause_factor.value(), 0.25);
        assert_eq!(session.voice.settings().speed, 1.15);
        assert_eq!(session.prompts.categories(), vec!["military"]);
        assert_eq!(
            session.saved_content(),
            SavedContent {
                mothership: true,
                prompt: true
            }
        );
        assert_eq!(rx.try_recv().unwrap(), CreatorEvent::ConfigLoaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sparse_document_mounts_and_saves_whole_sections() {
        let transport = Arc::new(RecordingTransport::new(sparse()));
        let session = session(&transport);

        session.mount().await.unwrap();

        assert!(session.is_loaded());
        assert_eq!(session.pause_factor.value(), 0.3);
        assert_eq!(session.voice.settings(), mothership_sync::VoiceSettings::default());
        assert_eq!(session.music.settings().track_id, "abc123def45");
        assert_eq!(session.music.start_time_display(), "0:00");
        assert_eq!(session.saved_content(), SavedContent::default());

        session.voice.set_speed(1.3).unwrap();
        session.music.set_volume(0.5).unwrap();
        wait(2000).await;

        let voice = transport.requests_to(&Method::PUT, &Endpoint::Voice)[0]
            .body
            .clone()
            .unwrap();
        assert_eq!(voice.as_object().unwrap().len(), 7);
        assert_eq!(voice["speed"], json!(1.3));
        assert_eq!(voice["voice_id"], json!("AvUYKSeryCcU2BHSM8x7"));

        let music = transport.requests_to(&Method::PUT, &Endpoint::Music)[0]
            .body
            .clone()
            .unwrap();
        assert_eq!(
            music,
            json!({ "track_id": "abc123def45", "start_time": 0, "trim_audio": 0.0, "volume": 0.5 })
        );
        assert_eq!(session.notifications().count(mothership_sync::Severity::Error), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_before_mount_are_never_written() {
        let transport = Arc::new(RecordingTransport::new(seeded()));
        let session = session(&transport);

        session.pause_factor.set(1.9).unwrap();
        session.music.set_volume(1.0).unwrap();
        wait(2000).await;
        assert_eq!(transport.write_count(), 0);

        session.mount().await.unwrap();
        wait(2000).await;
        assert_eq!(transport.write_count(), 0);
        assert_eq!(session.pause_factor.value(), 0.25);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_mount_keeps_panels_offline() {
        let transport = Arc::new(RecordingTransport::new(seeded()));
        transport.fail(Endpoint::Config);
        let session = session(&transport);
        let rx = session.subscribe();

        assert!(session.mount().await.is_err());
        assert!(!session.is_loaded());
        assert!(matches!(
            rx.try_recv().unwrap(),
            CreatorEvent::ConfigLoadFailed { .. }
        ));

        session.captions.toggle().unwrap();
        wait(1000).await;
        assert_eq!(transport.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_paths_and_flush() {
        let transport = Arc::new(RecordingTransport::new(seeded()));
        let session = session(&transport);
        session.mount().await.unwrap();

        session.set_value("video_generation.action_level", json!("low")).unwrap();
        assert!(session.set_value("video_generation", json!({})).is_err());
        session.music.set_trim_audio(4.5).unwrap();
        assert!(session.has_unsaved());

        let report = session.flush_all().await;
        assert_eq!(report.saved, 2);
        assert!(!session.has_unsaved());
        assert_eq!(
            transport.requests_to(
                &Method::PUT,
                &Endpoint::Value(FieldPath::parse("video_generation.action_level").unwrap())
            )[0]
            .body,
            Some(json!("low"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_cancels_autosaves() {
        let transport = Arc::new(RecordingTransport::new(seeded()));
        let session = session(&transport);
        session.mount().await.unwrap();

        session.voice.set_speed(1.5).unwrap();
        session.pause_factor.set(0.4).unwrap();
        assert_eq!(session.unmount(), 2);

        wait(2000).await;
        assert_eq!(transport.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_last_fills_form_and_submit() {
        let transport = Arc::new(RecordingTransport::new(seeded()));
        let session = session(&transport);
        session.mount().await.unwrap();

        session.load_last(MemoryField::Mothership).await.unwrap();
        session.load_last(MemoryField::Prompt).await.unwrap();
        session.update_form(|form| form.genre = "military_animation".to_string());
        assert_eq!(session.form().mothership, "Saved mothership");

        let response = session.submit().await.unwrap();
        assert!(response.is_success());
        assert!(session.overlay().success);
        session.dismiss_success();
        assert!(!session.overlay().success);
    }
}
