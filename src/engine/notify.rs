//! Notification feed toward presentation layers.
//!
//! A broadcast channel: every subscriber sees every notification sent
//! after it subscribed. A subscriber that falls behind loses the oldest
//! notifications; senders never wait.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::phase::{GamePhase, Transition};

/// Default number of notifications buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 256;

/// Something a UI may want to show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// The game phase changed.
    PhaseChanged {
        /// Phase before the change
        from: GamePhase,
        /// Phase after the change
        to: GamePhase,
        /// Transition marker
        transition: Transition,
        /// Session clock at the change
        game_time: f64,
    },
    /// A cue fired and its audio was queued.
    CueFired {
        /// Cue id
        cue_id: String,
        /// Spoken text
        text: String,
        /// Resolved audio file
        audio_path: String,
        /// Wall-clock time of the firing
        fired_at: DateTime<Utc>,
        /// Session clock of the firing
        game_time: f64,
    },
    /// A cue cannot be evaluated; sent once per configuration.
    ConfigurationWarning {
        /// Cue id
        cue_id: String,
        /// What is wrong
        message: String,
    },
    /// A cue fired but could not be voiced.
    DispatchFailed {
        /// Cue id
        cue_id: String,
        /// Error message
        error: String,
    },
}

/// Sending side of the feed. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Notifier {
    /// Creates a feed buffering `capacity` notifications per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Sends to current subscribers. Having none is not an error.
    pub fn send(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }

    /// Subscribes to notifications sent from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Subscribes as a `Stream`; lag shows up as `Err` items.
    #[must_use]
    pub fn stream(&self) -> BroadcastStream<Notification> {
        BroadcastStream::new(self.tx.subscribe())
    }
}
