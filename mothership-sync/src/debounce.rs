//! Keyed debounce timers
//!
//! Each key owns at most one armed timer. Re-scheduling a key aborts the
//! armed timer and arms a fresh one, so only the last action scheduled inside
//! a quiet window ever runs. Once a timer fires its action is detached from
//! the map and can no longer be cancelled.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Quiet period for sliders and text inputs
pub const FIELD_DELAY: Duration = Duration::from_millis(500);

/// Quiet period for groups where several fields change together (voice, music)
pub const GROUP_DELAY: Duration = Duration::from_millis(1000);

struct ArmedTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct TimerTable {
    armed: HashMap<String, ArmedTimer>,
    next_generation: u64,
}

/// Owned map from edit key to timer handle
#[derive(Clone, Default)]
pub struct Debouncer {
    table: Arc<Mutex<TimerTable>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `action` under `key`, cancelling whatever was armed there.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, key: impl Into<String>, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = key.into();
        let mut table = self.table.lock();

        if let Some(previous) = table.armed.remove(&key) {
            trace!("Debounce: re-arming {}", key);
            previous.handle.abort();
        }

        table.next_generation += 1;
        let generation = table.next_generation;
        let table_ref = Arc::clone(&self.table);
        let fire_key = key.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // Detach before running so a later schedule() cannot abort the action
            {
                let mut table = table_ref.lock();
                match table.armed.get(&fire_key) {
                    Some(timer) if timer.generation == generation => {
                        table.armed.remove(&fire_key);
                    }
                    _ => return,
                }
            }

            debug!("Debounce: firing {}", fire_key);
            action.await;
        });

        table.armed.insert(key, ArmedTimer { generation, handle });
    }

    /// Cancel the timer armed under `key`. Returns true if one was armed.
    pub fn cancel(&self, key: &str) -> bool {
        match self.table.lock().armed.remove(key) {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every armed timer (component teardown)
    pub fn cancel_all(&self) -> usize {
        let mut table = self.table.lock();
        let count = table.armed.len();
        for (_, timer) in table.armed.drain() {
            timer.handle.abort();
        }
        if count > 0 {
            debug!("Debounce: cancelled {} pending timer(s)", count);
        }
        count
    }

    pub fn is_armed(&self, key: &str) -> bool {
        self.table.lock().armed.contains_key(key)
    }

    pub fn armed_count(&self) -> usize {
        self.table.lock().armed.len()
    }
}
