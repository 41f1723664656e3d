//! UI events for the creator studio
//!
//! The session never draws anything itself. Overlay changes are published as
//! [`CreatorEvent`]s over a crossbeam channel and mirrored into an
//! [`OverlayState`] snapshot for callers that poll instead.
//!
//! The sink never holds a receiver. Until someone subscribes, and again once
//! the subscriber drops its receiver, events only update the snapshot.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use mothership_sync::Debouncer;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// How long the "selection saved" banner stays up
pub const SELECTION_BANNER_TTL: Duration = Duration::from_millis(3500);

/// Events are dropped, not queued forever, if nobody drains the channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

const BANNER_TIMER_KEY: &str = "selection-banner";

/// Events sent from the session to the UI
#[derive(Debug, Clone, PartialEq)]
pub enum CreatorEvent {
    /// Config document arrived and panels are live
    ConfigLoaded,
    /// Config could not be loaded; panels stay disabled
    ConfigLoadFailed { message: String },
    /// Full-screen spinner while `/api/process` runs
    LoadingOverlay { visible: bool },
    /// Celebration overlay after a successful submission
    SuccessOverlay { visible: bool },
    /// Short banner confirming a selection
    SelectionBanner { visible: bool },
    /// Saved memory flags changed
    MemoryAvailability { mothership: bool, prompt: bool },
    /// Generated video links from the last submission
    VideosReady { urls: Vec<String> },
}

/// Current overlay visibility
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayState {
    pub loading: bool,
    pub success: bool,
    pub banner: bool,
}

/// Sending half shared by everything in a session
#[derive(Clone)]
pub struct EventSink {
    tx: Arc<RwLock<Option<Sender<CreatorEvent>>>>,
    overlay: Arc<RwLock<OverlayState>>,
    timers: Debouncer,
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(RwLock::new(None)),
            overlay: Arc::new(RwLock::new(OverlayState::default())),
            timers: Debouncer::new(),
        }
    }

    /// Receiving half for the UI thread. A new subscription replaces the
    /// previous one, whose receiver then sees the channel disconnect.
    pub fn subscribe(&self) -> Receiver<CreatorEvent> {
        let (tx, rx) = bounded(EVENT_CHANNEL_CAPACITY);
        *self.tx.write() = Some(tx);
        rx
    }

    pub fn has_subscriber(&self) -> bool {
        self.tx.read().is_some()
    }

    pub fn overlay(&self) -> OverlayState {
        *self.overlay.read()
    }

    pub fn emit(&self, event: CreatorEvent) {
        {
            let mut overlay = self.overlay.write();
            match &event {
                CreatorEvent::LoadingOverlay { visible } => overlay.loading = *visible,
                CreatorEvent::SuccessOverlay { visible } => overlay.success = *visible,
                CreatorEvent::SelectionBanner { visible } => overlay.banner = *visible,
                _ => {}
            }
        }

        let mut tx = self.tx.write();
        let Some(sender) = tx.as_ref() else {
            return;
        };
        match sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                ::log::debug!("Event channel full, dropping {:?}", event);
            }
            Err(TrySendError::Disconnected(_)) => {
                ::log::debug!("Event subscriber went away");
                *tx = None;
            }
        }
    }

    /// Show the selection banner; it hides itself after [`SELECTION_BANNER_TTL`].
    /// Showing it again while visible restarts the countdown.
    pub fn show_selection_banner(&self) {
        self.emit(CreatorEvent::SelectionBanner { visible: true });

        if tokio::runtime::Handle::try_current().is_err() {
            return;
        }
        let sink = self.clone();
        self.timers.schedule(BANNER_TIMER_KEY, SELECTION_BANNER_TTL, async move {
            sink.emit(CreatorEvent::SelectionBanner { visible: false });
        });
    }

    /// Called when the success animation completes
    pub fn dismiss_success(&self) {
        self.emit(CreatorEvent::SuccessOverlay { visible: false });
    }

    /// Stop pending banner timers
    pub fn shutdown(&self) {
        self.timers.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_mirrors_events() {
        let sink = EventSink::new();
        let rx = sink.subscribe();

        sink.emit(CreatorEvent::LoadingOverlay { visible: true });
        assert!(sink.overlay().loading);
        sink.emit(CreatorEvent::LoadingOverlay { visible: false });
        sink.emit(CreatorEvent::SuccessOverlay { visible: true });

        let overlay = sink.overlay();
        assert!(!overlay.loading);
        assert!(overlay.success);
        assert_eq!(rx.try_iter().count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_banner_hides_after_ttl() {
        let sink = EventSink::new();
        sink.show_selection_banner();
        assert!(sink.overlay().banner);

        tokio::time::sleep(Duration::from_millis(3000)).await;
        sink.show_selection_banner();
        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert!(sink.overlay().banner);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!sink.overlay().banner);
    }

    #[test]
    fn test_full_channel_drops_events() {
        let sink = EventSink::new();
        let rx = sink.subscribe();
        for _ in 0..EVENT_CHANNEL_CAPACITY + 10 {
            sink.emit(CreatorEvent::ConfigLoaded);
        }
        assert_eq!(rx.len(), EVENT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_no_subscriber_buffers_nothing() {
        let sink = EventSink::new();
        for _ in 0..EVENT_CHANNEL_CAPACITY + 10 {
            sink.emit(CreatorEvent::SuccessOverlay { visible: true });
        }
        assert!(sink.overlay().success);

        // A late subscriber starts from an empty channel
        let rx = sink.subscribe();
        assert!(rx.is_empty());
        sink.emit(CreatorEvent::ConfigLoaded);
        assert_eq!(rx.try_recv().unwrap(), CreatorEvent::ConfigLoaded);
    }

    #[test]
    fn test_dropped_receiver_disconnects() {
        let sink = EventSink::new();
        let rx = sink.subscribe();
        sink.emit(CreatorEvent::ConfigLoaded);
        drop(rx);

        sink.emit(CreatorEvent::LoadingOverlay { visible: true });
        assert!(!sink.has_subscriber());
        assert!(sink.overlay().loading);

        let replaced = sink.subscribe();
        let current = sink.subscribe();
        sink.emit(CreatorEvent::ConfigLoaded);
        assert!(replaced.try_recv().is_err());
        assert_eq!(current.try_recv().unwrap(), CreatorEvent::ConfigLoaded);
    }
}
