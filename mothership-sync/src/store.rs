//! Field store
//!
//! One [`FieldStore`] per settings section. It owns the section's local copy,
//! the ledger of unacknowledged edits and the section's debounce timer.
//!
//! `set()` updates the local copy synchronously and (once the load gate is
//! open) re-arms the section timer. When the timer fires the store turns the
//! pending edits into one or more requests, depending on how the backend
//! accepts writes for that section:
//!
//! ```text
//! Section      Delay    Route                 Payload
//! -----------  -------  --------------------  ------------------------------
//! Voice        1000ms   PUT /voice            whole voice object
//! Music        1000ms   PUT /music            whole music object
//! Captions     0ms      PUT /captions         dirty leaves only
//! PauseFactor  500ms    PUT /audio            dirty leaves only
//! Prompts      500ms    GET+PUT /prompts/{c}  fetched category + edits
//! Value(root)  500ms    PUT /value?path=..    one request per leaf
//! ```
//!
//! Local values are never rolled back. A rejected edit stays in the ledger
//! with status [`FieldStatus::Failed`] and goes out again with the next save.

use crate::client::SyncClient;
use crate::debounce::{Debouncer, FIELD_DELAY, GROUP_DELAY};
use crate::error::{SyncError, SyncResult};
use crate::loader::LoadGate;
use crate::notify::NotificationCenter;
use crate::patch::{get_at, partial_payload, set_in_place, PendingEdit, PendingEdits};
use crate::path::FieldPath;
use crate::schema::{decode_lenient, format_start_time, MusicSettings, StartTime, VoiceSettings};
use crate::transport::Endpoint;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Longest track title shown in full inside a notification
pub const MAX_TITLE_CHARS: usize = 30;

/// Cut `title` to [`MAX_TITLE_CHARS`] characters, appending `...` if cut
pub fn truncate_title(title: &str) -> String {
    if title.chars().count() > MAX_TITLE_CHARS {
        let head: String = title.chars().take(MAX_TITLE_CHARS).collect();
        format!("{}...", head)
    } else {
        title.to_string()
    }
}

/// How a section's edits reach the backend
#[derive(Debug, Clone, PartialEq)]
pub enum SaveRoute {
    /// Send the whole local section
    Replace(Endpoint),
    /// Send only the dirty leaves
    Partial(Endpoint),
    /// Fetch-patch-replace per prompt category
    PromptCategories,
    /// One path-addressed PUT per dirty leaf
    PerPath(FieldPath),
}

/// Editable settings sections
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Section {
    Voice,
    Music,
    Captions,
    PauseFactor,
    Prompts,
    /// Any other subtree, written through `/api/config/value`
    Value(FieldPath),
}

impl Section {
    /// Debounce key, also used in logs
    pub fn key(&self) -> String {
        match self {
            Section::Voice => "voice".to_string(),
            Section::Music => "music".to_string(),
            Section::Captions => "captions".to_string(),
            Section::PauseFactor => "pause_factor".to_string(),
            Section::Prompts => "prompts".to_string(),
            Section::Value(root) => format!("value:{}", root),
        }
    }

    /// Inverse of [`Section::key`]
    pub fn from_key(key: &str) -> SyncResult<Self> {
        match key {
            "voice" => Ok(Section::Voice),
            "music" => Ok(Section::Music),
            "captions" => Ok(Section::Captions),
            "pause_factor" => Ok(Section::PauseFactor),
            "prompts" => Ok(Section::Prompts),
            other => match other.strip_prefix("value:") {
                Some(root) => Ok(Section::Value(FieldPath::parse(root)?)),
                None => Err(SyncError::Validation(format!("Unknown section: {}", other))),
            },
        }
    }

    /// The section's subtree inside the full config document
    pub fn locate<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        let walk = |keys: &[&str]| {
            keys.iter()
                .try_fold(document, |node, key| node.as_object()?.get(*key))
        };
        match self {
            Section::Voice => walk(&["audio", "voice"]),
            Section::Music => walk(&["music"]),
            Section::Captions => walk(&["captions"]),
            Section::PauseFactor => walk(&["audio"]),
            Section::Prompts => walk(&["prompts"]),
            Section::Value(root) => get_at(document, root),
        }
    }

    /// Local copy for a freshly loaded document.
    ///
    /// Whole-object sections start from their defaults with the loaded fields
    /// laid over them, so a missing or partial section still saves complete.
    pub fn hydrate_value(&self, document: &Value) -> Value {
        let raw = self.locate(document).cloned().unwrap_or_else(|| json!({}));
        let defaults = match self {
            Section::Voice => serde_json::to_value(VoiceSettings::default()),
            Section::Music => serde_json::to_value(MusicSettings::default()),
            _ => return raw,
        };

        let mut local = defaults.unwrap_or_else(|_| json!({}));
        if let (Some(base), Some(fields)) = (local.as_object_mut(), raw.as_object()) {
            for (key, value) in fields {
                if !value.is_null() {
                    base.insert(key.clone(), value.clone());
                }
            }
        }
        local
    }

    pub fn route(&self) -> SaveRoute {
        match self {
            Section::Voice => SaveRoute::Replace(Endpoint::Voice),
            Section::Music => SaveRoute::Replace(Endpoint::Music),
            Section::Captions => SaveRoute::Partial(Endpoint::Captions),
            Section::PauseFactor => SaveRoute::Partial(Endpoint::Audio),
            Section::Prompts => SaveRoute::PromptCategories,
            Section::Value(root) => SaveRoute::PerPath(root.clone()),
        }
    }

    /// Quiet period before a save. Captions toggles save immediately.
    pub fn delay(&self) -> Duration {
        match self {
            Section::Voice | Section::Music => GROUP_DELAY,
            Section::Captions => Duration::ZERO,
            Section::PauseFactor | Section::Prompts | Section::Value(_) => FIELD_DELAY,
        }
    }

    /// Reject paths the section's route cannot express
    pub fn check_path(&self, path: &FieldPath) -> SyncResult<()> {
        match self {
            // <category>.<kind>.<field>
            Section::Prompts if path.len() < 3 => Err(SyncError::InvalidPath(format!(
                "prompt edits need <category>.<kind>.<field>, got {}",
                path
            ))),
            _ => Ok(()),
        }
    }

    /// Reason to hold back a save for now, if any
    pub fn skip_reason(&self, local: &Value) -> Option<&'static str> {
        match self {
            Section::Voice => {
                let voice_id = local.get("voice_id").and_then(Value::as_str).unwrap_or("");
                if voice_id.trim().is_empty() {
                    Some("no voice id selected")
                } else {
                    None
                }
            }
            Section::Music => {
                let track_id = local.get("track_id").and_then(Value::as_str).unwrap_or("");
                if track_id.trim().is_empty() {
                    Some("no track selected")
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Body for [`SaveRoute::Replace`] sections: the complete typed object,
    /// with defaults for anything the local copy lacks
    fn replace_payload(&self, local: &Value) -> SyncResult<Value> {
        match self {
            Section::Voice => Ok(serde_json::to_value(decode_lenient::<VoiceSettings>(local)?)?),
            Section::Music => {
                let music: MusicSettings = decode_lenient(local)?;
                // The backend stores seconds; preset tracks carry no title
                let mut payload = serde_json::to_value(&music)?;
                payload["start_time"] = json!(music.start_time.seconds());
                Ok(payload)
            }
            _ => Ok(local.clone()),
        }
    }

    /// Notification for an accepted batch
    pub fn success_message(&self, sent: &[PendingEdit], local: &Value) -> String {
        match self {
            Section::Voice => "Voice settings saved".to_string(),
            Section::Music => music_message(sent, local),
            Section::Captions => {
                if sent.iter().any(|e| e.path.leaf() == "style") {
                    "Caption style updated successfully".to_string()
                } else {
                    let enabled = local.get("enabled").and_then(Value::as_bool).unwrap_or(false);
                    format!(
                        "Captions {} successfully",
                        if enabled { "enabled" } else { "disabled" }
                    )
                }
            }
            Section::PauseFactor => "Pause factor updated".to_string(),
            Section::Prompts | Section::Value(_) => "Saved successfully".to_string(),
        }
    }

    /// Fallback notification for a rejected batch
    pub fn failure_message(&self, sent: &[PendingEdit]) -> String {
        match self {
            Section::Voice => "Failed to update audio settings".to_string(),
            Section::Music => "Failed to update music settings".to_string(),
            Section::Captions => {
                if sent.iter().any(|e| e.path.leaf() == "style") {
                    "Failed to update caption style".to_string()
                } else {
                    "Failed to update caption status".to_string()
                }
            }
            Section::PauseFactor => "Failed to update pause factor".to_string(),
            Section::Prompts => {
                let first = sent.first().map(|e| e.path.to_string()).unwrap_or_default();
                format!("Failed to save: prompts.{}", first)
            }
            Section::Value(root) => {
                let first = sent
                    .first()
                    .map(|e| root.join(&e.path).to_string())
                    .unwrap_or_else(|| root.to_string());
                format!("Failed to save: {}", first)
            }
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

fn music_message(sent: &[PendingEdit], local: &Value) -> String {
    let only = |leaf: &str| sent.iter().all(|e| e.path.leaf() == leaf);
    let number = |key: &str| local.get(key).and_then(Value::as_f64).unwrap_or(0.0);

    if only("volume") {
        return format!("Volume updated to {}%", (number("volume") * 100.0).round());
    }
    if only("trim_audio") {
        return format!("Trim audio updated to {:.1}s", number("trim_audio"));
    }
    if only("start_time") {
        let display = local
            .get("start_time")
            .cloned()
            .and_then(|raw| serde_json::from_value::<StartTime>(raw).ok())
            .map(|t| t.display())
            .unwrap_or_else(|| format_start_time(0));
        return format!("Start time updated to {}", display);
    }

    let title = local
        .get("custom_title")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .or_else(|| local.get("track_id").and_then(Value::as_str))
        .unwrap_or("");
    format!("Music track \"{}\" selected", truncate_title(title))
}

/// Per-field sync state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldStatus {
    /// Matches the last loaded or saved document
    #[default]
    Clean,
    /// Edited, not yet acknowledged
    Pending,
    Saved,
    /// Last save was rejected; the local value is unsaved
    Failed,
}

/// Outcome of one save pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: usize,
    pub failed: usize,
    pub skipped: bool,
}

enum Write {
    Put(Endpoint, Value),
    FetchPatchReplace(String, Vec<PendingEdit>),
}

/// Edits that travel together in one request
struct Batch {
    edits: Vec<PendingEdit>,
    write: Write,
}

fn plan_batches(section: &Section, local: &Value, edits: &[PendingEdit]) -> SyncResult<Vec<Batch>> {
    let batches = match section.route() {
        SaveRoute::Replace(endpoint) => vec![Batch {
            edits: edits.to_vec(),
            write: Write::Put(endpoint, section.replace_payload(local)?),
        }],
        SaveRoute::Partial(endpoint) => vec![Batch {
            edits: edits.to_vec(),
            write: Write::Put(endpoint, partial_payload(edits)?),
        }],
        SaveRoute::PromptCategories => {
            let mut by_category: BTreeMap<String, Vec<PendingEdit>> = BTreeMap::new();
            for edit in edits {
                by_category
                    .entry(edit.path.head().to_string())
                    .or_default()
                    .push(edit.clone());
            }
            let mut batches = Vec::with_capacity(by_category.len());
            for (category, edits) in by_category {
                let prefix = FieldPath::from_segments([category.as_str()])?;
                let relative = edits
                    .iter()
                    .filter_map(|e| {
                        Some(PendingEdit {
                            path: e.path.strip_prefix(&prefix)?,
                            ..e.clone()
                        })
                    })
                    .collect();
                batches.push(Batch {
                    edits,
                    write: Write::FetchPatchReplace(category, relative),
                });
            }
            batches
        }
        SaveRoute::PerPath(root) => edits
            .iter()
            .map(|edit| Batch {
                edits: vec![edit.clone()],
                write: Write::Put(Endpoint::Value(root.join(&edit.path)), edit.value.clone()),
            })
            .collect(),
    };
    Ok(batches)
}

#[derive(Default)]
struct StoreState {
    local: Value,
    hydrated: bool,
    ledger: PendingEdits,
    status: HashMap<FieldPath, FieldStatus>,
}

struct StoreInner {
    section: Section,
    client: SyncClient,
    notifications: NotificationCenter,
    gate: LoadGate,
    debouncer: Debouncer,
    state: Mutex<StoreState>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        self.debouncer.cancel_all();
    }
}

impl StoreInner {
    async fn save(&self) -> SaveReport {
        let mut report = SaveReport::default();
        if !self.gate.is_open() {
            debug!("{}: config not loaded, save held back", self.section);
            return report;
        }

        let (edits, local) = {
            let state = self.state.lock();
            (state.ledger.snapshot(), state.local.clone())
        };
        if edits.is_empty() {
            return report;
        }

        if let Some(reason) = self.section.skip_reason(&local) {
            info!("{}: save skipped ({})", self.section, reason);
            report.skipped = true;
            return report;
        }

        let batches = match plan_batches(&self.section, &local, &edits) {
            Ok(batches) => batches,
            Err(e) => {
                error!("{}: could not build payload: {}", self.section, e);
                self.mark_failed(&edits);
                self.notifications
                    .error(e.user_message(&self.section.failure_message(&edits)));
                report.failed = edits.len();
                return report;
            }
        };

        for batch in batches {
            let outcome = match &batch.write {
                Write::Put(endpoint, payload) => self.client.put(endpoint, payload).await.map(|_| ()),
                Write::FetchPatchReplace(category, relative) => self
                    .client
                    .fetch_patch_replace(category, relative)
                    .await
                    .map(|_| ()),
            };

            match outcome {
                Ok(()) => {
                    self.mark_saved(&batch.edits);
                    report.saved += batch.edits.len();
                    self.notifications
                        .success(self.section.success_message(&batch.edits, &local));
                }
                Err(e) => {
                    error!("{}: save failed: {}", self.section, e);
                    self.mark_failed(&batch.edits);
                    report.failed += batch.edits.len();
                    self.notifications
                        .error(e.user_message(&self.section.failure_message(&batch.edits)));
                }
            }
        }
        report
    }

    fn mark_saved(&self, sent: &[PendingEdit]) {
        let mut state = self.state.lock();
        let sent: Vec<(FieldPath, u64)> = sent.iter().map(|e| (e.path.clone(), e.seq)).collect();
        for path in state.ledger.settle(&sent) {
            state.status.insert(path, FieldStatus::Saved);
        }
    }

    /// Only edits not superseded since they were sent become Failed
    fn mark_failed(&self, sent: &[PendingEdit]) {
        let mut state = self.state.lock();
        for edit in sent {
            if state.ledger.seq_of(&edit.path) == Some(edit.seq) {
                state.status.insert(edit.path.clone(), FieldStatus::Failed);
            }
        }
    }
}

/// Local state and autosave for one section
#[derive(Clone)]
pub struct FieldStore {
    inner: Arc<StoreInner>,
}

impl FieldStore {
    pub fn new(
        section: Section,
        client: SyncClient,
        notifications: NotificationCenter,
        gate: LoadGate,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                section,
                client,
                notifications,
                gate,
                debouncer: Debouncer::new(),
                state: Mutex::new(StoreState {
                    local: json!({}),
                    ..Default::default()
                }),
            }),
        }
    }

    pub fn section(&self) -> &Section {
        &self.inner.section
    }

    /// Replace the local copy with the section taken from `document`.
    ///
    /// The loaded document is authoritative: edits made before it arrived
    /// are discarded and every field goes back to [`FieldStatus::Clean`].
    pub fn hydrate(&self, document: &Value) {
        let local = self.inner.section.hydrate_value(document);

        self.inner.debouncer.cancel_all();
        let mut state = self.inner.state.lock();
        if !state.ledger.is_empty() {
            debug!(
                "{}: discarding {} edit(s) made before load",
                self.inner.section,
                state.ledger.len()
            );
        }
        state.local = local;
        state.ledger.clear();
        state.status.clear();
        state.hydrated = true;
    }

    pub fn is_hydrated(&self) -> bool {
        self.inner.state.lock().hydrated
    }

    /// Apply an edit locally and arm the section's autosave
    pub fn set(&self, path: &FieldPath, value: Value) -> SyncResult<()> {
        self.inner.section.check_path(path)?;
        {
            let mut state = self.inner.state.lock();
            set_in_place(&mut state.local, path, value.clone())?;
            state.ledger.record(path.clone(), value);
            state
                .status
                .retain(|existing, _| existing == path || !path.is_prefix_of(existing));
            state.status.insert(path.clone(), FieldStatus::Pending);
        }

        if !self.inner.gate.is_open() {
            debug!("{}: {} changed before load, not scheduling", self.inner.section, path);
            return Ok(());
        }
        self.schedule_save();
        Ok(())
    }

    /// Convenience for `set(FieldPath::parse(path)?, value)`
    pub fn set_str(&self, path: &str, value: Value) -> SyncResult<()> {
        self.set(&FieldPath::parse(path)?, value)
    }

    fn schedule_save(&self) {
        if tokio::runtime::Handle::try_current().is_err() {
            warn!("{}: no async runtime, edit left pending", self.inner.section);
            return;
        }
        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);
        self.inner.debouncer.schedule(
            self.inner.section.key(),
            self.inner.section.delay(),
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.save().await;
                }
            },
        );
    }

    /// Save pending edits now instead of waiting for the timer
    pub async fn flush(&self) -> SaveReport {
        self.inner.debouncer.cancel(&self.inner.section.key());
        self.inner.save().await
    }

    /// Cancel the armed timer. In-flight requests are left to finish.
    pub fn unmount(&self) -> usize {
        self.inner.debouncer.cancel_all()
    }

    pub fn has_armed_save(&self) -> bool {
        self.inner.debouncer.is_armed(&self.inner.section.key())
    }

    /// Local copy of the section
    pub fn value(&self) -> Value {
        self.inner.state.lock().local.clone()
    }

    pub fn get(&self, path: &FieldPath) -> Option<Value> {
        get_at(&self.inner.state.lock().local, path).cloned()
    }

    /// Local copy decoded into a schema type
    pub fn typed<T: DeserializeOwned>(&self) -> SyncResult<T> {
        decode_lenient(&self.value())
    }

    pub fn status(&self, path: &FieldPath) -> FieldStatus {
        self.inner
            .state
            .lock()
            .status
            .get(path)
            .copied()
            .unwrap_or_default()
    }

    /// Every field that is not clean
    pub fn statuses(&self) -> Vec<(FieldPath, FieldStatus)> {
        let mut all: Vec<_> = self
            .inner
            .state
            .lock()
            .status
            .iter()
            .map(|(p, s)| (p.clone(), *s))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// True while any local value has not been accepted by the backend
    pub fn has_unsaved(&self) -> bool {
        self.inner
            .state
            .lock()
            .status
            .values()
            .any(|s| matches!(s, FieldStatus::Pending | FieldStatus::Failed))
    }

    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().ledger.len()
    }
}
