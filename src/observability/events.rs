//! Structured event stream.
//!
//! Discrete, typed engine events serialized as newline-delimited JSON
//! with a monotonically increasing sequence number. The emitter is an
//! owned sink handed to the engine, not global state: it buffers lines
//! and is flushed explicitly at the end of every tick, on stop and on
//! drop.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted by the engine.
///
/// Serialized with a `"type"` tag so consumers can dispatch on the kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The scheduler started polling.
    EngineStarted {
        /// When polling started.
        timestamp: DateTime<Utc>,
        /// Pack active at start.
        pack_id: String,
        /// Poll period in milliseconds.
        poll_period_ms: u64,
    },

    /// The scheduler stopped.
    EngineStopped {
        /// When the scheduler stopped.
        timestamp: DateTime<Utc>,
        /// Ticks executed.
        ticks: u64,
    },

    /// A poll failed or reported no game.
    PollFailed {
        /// When the poll completed.
        timestamp: DateTime<Utc>,
        /// Failure kind (`not_in_game`, `timeout`, ...).
        kind: String,
        /// Failure detail.
        message: String,
    },

    /// A game session started.
    SessionStarted {
        /// When the session was detected.
        timestamp: DateTime<Utc>,
        /// Session number.
        session: u64,
        /// Game time at detection.
        game_time: f64,
    },

    /// A game session ended.
    SessionEnded {
        /// When the end was detected.
        timestamp: DateTime<Utc>,
        /// Session number.
        session: u64,
        /// Final session clock.
        game_time: f64,
        /// Human-readable reason.
        reason: String,
    },

    /// A cue fired and its audio was handed to playback.
    CueFired {
        /// When the cue was dispatched.
        timestamp: DateTime<Utc>,
        /// Cue id.
        cue_id: String,
        /// Trigger kind.
        trigger: String,
        /// Session clock at the firing.
        game_time: f64,
        /// Audio file queued for playback.
        audio_path: String,
    },

    /// A cue fired but its audio could not be produced.
    DispatchFailed {
        /// When the failure happened.
        timestamp: DateTime<Utc>,
        /// Cue id.
        cue_id: String,
        /// Error message.
        error: String,
    },

    /// A cue cannot be evaluated and will not fire until edited.
    CueConfigWarning {
        /// When the problem was first seen.
        timestamp: DateTime<Utc>,
        /// Cue id.
        cue_id: String,
        /// What is wrong.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// [`emit`](Self::emit) only buffers; lines reach the underlying writer on
/// [`flush`](Self::flush), when the buffer fills, or on drop.
/// Serialization and I/O failures are dropped silently.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

// Box<dyn Write> is not Debug
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stderr. Stdout carries the fired
    /// cue feed in `run`, so events stay off it.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Buffers an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        let mut w = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Ok(line) = serde_json::to_string(&envelope) {
            let _ = writeln!(w, "{line}");
        }
    }

    /// Writes buffered lines through to the underlying writer.
    pub fn flush(&self) {
        let mut w = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = w.flush();
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

impl Drop for EventEmitter {
    fn drop(&mut self) {
        let w = self.writer.get_mut().unwrap_or_else(PoisonError::into_inner);
        let _ = w.flush();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
