//! Prompt manager panel
//!
//! Edits `prompts.<category>.<creative|polish>.<field>`. Each category is
//! saved by re-fetching it and replaying the pending edits on top, since the
//! backend replaces the whole category on write.

use mothership_sync::{
    decode_lenient, ConfigDocument, FieldPath, FieldStore, PromptCategory, PromptKind, SyncError,
    SyncResult,
};
use parking_lot::RwLock;
use serde_json::{json, Value};

/// Category selected when the panel opens
pub const DEFAULT_CATEGORY: &str = "military";

pub struct PromptsPanel {
    store: FieldStore,
    active: RwLock<String>,
}

impl PromptsPanel {
    pub fn new(store: FieldStore) -> Self {
        Self {
            store,
            active: RwLock::new(DEFAULT_CATEGORY.to_string()),
        }
    }

    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    /// Categories present in the loaded document
    pub fn categories(&self) -> Vec<String> {
        self.store
            .value()
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn active_category(&self) -> String {
        self.active.read().clone()
    }

    pub fn select_category(&self, category: &str) -> SyncResult<()> {
        let category = category.trim();
        if category.is_empty() || category.contains('.') {
            return Err(SyncError::InvalidPath(category.to_string()));
        }
        *self.active.write() = category.to_string();
        Ok(())
    }

    /// Active category with UI defaults filled in for missing fields
    pub fn current(&self) -> PromptCategory {
        self.category(&self.active_category())
    }

    pub fn category(&self, name: &str) -> PromptCategory {
        self.store
            .value()
            .get(name)
            .and_then(|raw| decode_lenient(raw).ok())
            .unwrap_or_default()
    }

    fn field_path(&self, kind: PromptKind, field: &str) -> SyncResult<FieldPath> {
        FieldPath::from_segments([self.active_category().as_str(), kind.key(), field])
    }

    /// Set one field of the active category
    pub fn set_field(&self, kind: PromptKind, field: &str, value: Value) -> SyncResult<()> {
        let path = self.field_path(kind, field)?;
        ::log::debug!("Prompt edit {}", path);
        self.store.set(&path, value)
    }

    pub fn set_prompt_text(&self, kind: PromptKind, text: &str) -> SyncResult<()> {
        self.set_field(kind, "prompt", json!(text))
    }

    pub fn set_creativity_level(&self, level: u8) -> SyncResult<()> {
        self.set_field(PromptKind::Creative, "creativity_level", json!(level.clamp(1, 10)))
    }

    pub fn set_clarity_level(&self, level: u8) -> SyncResult<()> {
        self.set_field(PromptKind::Polish, "clarity_level", json!(level.clamp(1, 10)))
    }

    /// Add or remove a favourite video; returns true if it is now a favourite
    pub fn toggle_favorite_video(&self, video: &str) -> SyncResult<bool> {
        let mut favorites = self.current().creative.favorite_videos;
        let now_favorite = match favorites.iter().position(|v| v == video) {
            Some(index) => {
                favorites.remove(index);
                false
            }
            None => {
                favorites.push(video.to_string());
                true
            }
        };
        self.set_field(PromptKind::Creative, "favorite_videos", json!(favorites))?;
        Ok(now_favorite)
    }

    /// Append a polish command. Blank commands are ignored.
    pub fn add_command(&self, command: &str) -> SyncResult<bool> {
        let command = command.trim();
        if command.is_empty() {
            return Ok(false);
        }
        let mut commands = self.current().polish.specific_commands;
        commands.push(command.to_string());
        self.set_field(PromptKind::Polish, "specific_commands", json!(commands))?;
        Ok(true)
    }

    pub fn remove_command(&self, index: usize) -> SyncResult<Option<String>> {
        let mut commands = self.current().polish.specific_commands;
        if index >= commands.len() {
            return Ok(None);
        }
        let removed = commands.remove(index);
        self.set_field(PromptKind::Polish, "specific_commands", json!(commands))?;
        Ok(Some(removed))
    }
}

/// Videos offered for `category` (`video_list.<category>` in the config)
pub fn available_videos(config: &ConfigDocument, category: &str) -> Vec<String> {
    config
        .extra
        .get("video_list")
        .and_then(|lists| lists.get(category))
        .and_then(|list| serde_json::from_value(list.clone()).ok())
        .unwrap_or_else(|| {
            ::log::warn!("No video list found for category: {}", category);
            Vec::new()
        })
}
