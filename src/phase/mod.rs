//! Game phase tracking.
//!
//! - [`PhaseTracker`]: consumes poll results, yields [`PhaseEvent`]s
//! - [`state`]: phase, transition and end-reason types

pub mod state;
pub mod tracker;

pub use state::{EndReason, GamePhase, PhaseEvent, Transition};
pub use tracker::{DEFAULT_FAILURE_THRESHOLD, PhaseTracker};
