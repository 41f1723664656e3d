//! Pause factor panel
//!
//! Single slider (0.0 to 2.0) controlling the pause between narrated
//! sentences, saved to `/api/config/audio` half a second after it settles.

use mothership_sync::{FieldStore, SyncResult, DEFAULT_PAUSE_FACTOR};
use serde_json::{json, Value};

pub const MAX_PAUSE_FACTOR: f64 = 2.0;

pub struct PauseFactorPanel {
    store: FieldStore,
}

impl PauseFactorPanel {
    pub fn new(store: FieldStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    pub fn value(&self) -> f64 {
        self.store
            .value()
            .get("pause_factor")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_PAUSE_FACTOR)
    }

    pub fn set(&self, factor: f64) -> SyncResult<()> {
        self.store
            .set_str("pause_factor", json!(factor.clamp(0.0, MAX_PAUSE_FACTOR)))
    }
}
