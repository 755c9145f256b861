//! Game phase types.

use serde::Serialize;

/// Where the observed game is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// No session has been observed yet
    NotStarted,
    /// A session is running; cues are evaluated
    InProgress,
    /// The last session is over; waiting for the next one
    Ended,
}

impl GamePhase {
    /// Lowercase name for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Ended => "ended",
        }
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndReason {
    /// The data source reported the game as over
    Signal,
    /// The data source was unavailable for too many consecutive polls
    Unavailable {
        /// Consecutive failed or absent polls
        failures: u32,
    },
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signal => f.write_str("game ended"),
            Self::Unavailable { failures } => {
                write!(f, "data source unavailable for {failures} polls")
            }
        }
    }
}

/// Transition marker raised by one tracker step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    /// Entered `InProgress`; firing records must be reset
    SessionStarted {
        /// Session number, starting at 1
        session: u64,
    },
    /// Left `InProgress`; firing records must be discarded
    SessionEnded {
        /// Session that ended
        session: u64,
        /// Why it ended
        reason: EndReason,
    },
    /// Phase unchanged
    NoChange,
}

impl Transition {
    /// Short label for metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::SessionEnded { .. } => "session_ended",
            Self::NoChange => "no_change",
        }
    }

    /// Whether the phase changed.
    #[must_use]
    pub const fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

/// Result of advancing the tracker by one poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseEvent {
    /// Phase before this step
    pub previous: GamePhase,
    /// Phase after this step
    pub phase: GamePhase,
    /// Session clock in seconds. Monotonic while `InProgress`; on the
    /// step that ends a session it is that session's final clock.
    pub game_time: f64,
    /// Transition raised by this step
    pub transition: Transition,
}
