//! Notification sink
//!
//! Transient user-facing messages. Entries are kept in insertion order,
//! each expires on its own timer, and the queue is capped so a burst of
//! failures cannot stack without bound (oldest entry is evicted first).

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long a toast stays visible
pub const NOTIFICATION_TTL: Duration = Duration::from_millis(3000);

/// Maximum concurrent notifications
pub const DEFAULT_NOTIFICATION_CAP: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Info,
    Warning,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Info => "info",
            Severity::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

/// `<unix-millis>-<9 random base36 chars>`
pub fn notification_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .map(|c| (c as char).to_ascii_lowercase())
        .take(9)
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

struct Queue {
    entries: VecDeque<Notification>,
    cap: usize,
}

/// Shared, cloneable notification queue
#[derive(Clone)]
pub struct NotificationCenter {
    queue: Arc<RwLock<Queue>>,
    ttl: Duration,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_CAP)
    }
}

impl NotificationCenter {
    pub fn new(cap: usize) -> Self {
        Self::with_ttl(cap, NOTIFICATION_TTL)
    }

    pub fn with_ttl(cap: usize, ttl: Duration) -> Self {
        Self {
            queue: Arc::new(RwLock::new(Queue {
                entries: VecDeque::new(),
                cap: cap.max(1),
            })),
            ttl,
        }
    }

    /// Append a notification and arm its expiry timer.
    ///
    /// Expiry needs a tokio runtime; without one the entry stays until it is
    /// dismissed or evicted.
    pub fn push(&self, message: impl Into<String>, severity: Severity) -> String {
        let notification = Notification {
            id: notification_id(),
            message: message.into(),
            severity,
            created_at: Utc::now(),
        };
        let id = notification.id.clone();

        match severity {
            Severity::Error | Severity::Warning => warn!("[{}] {}", severity.label(), notification.message),
            _ => info!("[{}] {}", severity.label(), notification.message),
        }

        {
            let mut queue = self.queue.write();
            if queue.entries.len() >= queue.cap {
                if let Some(evicted) = queue.entries.pop_front() {
                    debug!("Notification cap reached, evicting {}", evicted.id);
                }
            }
            queue.entries.push_back(notification);
        }

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let center = self.clone();
            let expire_id = id.clone();
            let ttl = self.ttl;
            runtime.spawn(async move {
                tokio::time::sleep(ttl).await;
                center.dismiss(&expire_id);
            });
        }

        id
    }

    pub fn success(&self, message: impl Into<String>) -> String {
        self.push(message, Severity::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> String {
        self.push(message, Severity::Error)
    }

    pub fn info(&self, message: impl Into<String>) -> String {
        self.push(message, Severity::Info)
    }

    /// Remove immediately. Returns false if it already expired.
    pub fn dismiss(&self, id: &str) -> bool {
        let mut queue = self.queue.write();
        let before = queue.entries.len();
        queue.entries.retain(|n| n.id != id);
        queue.entries.len() != before
    }

    /// Visible notifications, oldest first
    pub fn visible(&self) -> Vec<Notification> {
        self.queue.read().entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.queue.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.read().entries.is_empty()
    }

    /// Count of visible notifications with `severity`
    pub fn count(&self, severity: Severity) -> usize {
        self.queue
            .read()
            .entries
            .iter()
            .filter(|n| n.severity == severity)
            .count()
    }

    pub fn clear(&self) {
        self.queue.write().entries.clear();
    }
}
