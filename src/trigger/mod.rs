//! Trigger evaluation.
//!
//! - [`evaluate`]: pure per-tick decision over the active cues
//! - [`FiringRecords`]: per-session history threaded between ticks
//! - [`WarningLedger`]: reports each unusable cue once

pub mod evaluator;
pub mod record;
pub mod warnings;

pub use evaluator::{CueFireDecision, CueWarning, Evaluation, SPAWN_GRACE, evaluate};
pub use record::{FiringRecord, FiringRecords};
pub use warnings::WarningLedger;
