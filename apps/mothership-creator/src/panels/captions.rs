//! Captions panel
//!
//! Toggles and style picks are written to `/api/config/captions` straight
//! away, sending only the field that changed.

use mothership_sync::{CaptionSettings, CaptionStyle, FieldStore, SyncResult};
use serde_json::json;

pub struct CaptionsPanel {
    store: FieldStore,
}

impl CaptionsPanel {
    pub fn new(store: FieldStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    pub fn settings(&self) -> CaptionSettings {
        self.store.typed().unwrap_or_default()
    }

    /// Flip `enabled`, returning the new value
    pub fn toggle(&self) -> SyncResult<bool> {
        let enabled = !self.settings().enabled;
        self.store.set_str("enabled", json!(enabled))?;
        Ok(enabled)
    }

    /// Pick a style. Returns false (and sends nothing) if it is already active.
    pub fn set_style(&self, style: CaptionStyle) -> SyncResult<bool> {
        if self.settings().style == style {
            return Ok(false);
        }
        self.store.set_str("style", json!(style.name()))?;
        Ok(true)
    }
}
