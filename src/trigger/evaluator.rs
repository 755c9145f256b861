//! Trigger evaluation.
//!
//! [`evaluate`] is a pure function: the same phase, clock, cues, records
//! and snapshot always give the same decisions. It never mutates the
//! records it is given and returns the updated map instead.

use crate::cue::{Cue, TriggerRule, TriggerType};
use crate::error::CueConfigError;
use crate::phase::GamePhase;
use crate::source::GameSnapshot;

use super::record::{FiringRecord, FiringRecords};

/// Seconds past a spawn during which an objective cue may still fire.
/// An occurrence first seen later than this is recorded without firing.
pub const SPAWN_GRACE: f64 = 2.0;

/// A cue that fires on this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct CueFireDecision {
    /// The cue as it was in the pack snapshot evaluated
    pub cue: Cue,
    /// Session clock at the firing
    pub game_time: f64,
}

impl CueFireDecision {
    /// Trigger kind that fired.
    #[must_use]
    pub const fn trigger(&self) -> TriggerType {
        self.cue.trigger_type
    }
}

/// A cue that cannot be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueWarning {
    /// Offending cue
    pub cue_id: String,
    /// Trigger configuration fingerprint at the time of the report
    pub fingerprint: u64,
    /// What is wrong
    pub error: CueConfigError,
}

/// Everything one evaluation produced.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    /// Firings in pack order
    pub decisions: Vec<CueFireDecision>,
    /// Records to use on the next tick
    pub records: FiringRecords,
    /// Cues that were skipped as unusable, in pack order
    pub warnings: Vec<CueWarning>,
}

/// Outcome for a single cue.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Verdict {
    /// Fire and store this record
    Fire(FiringRecord),
    /// Store this record without firing
    Mark(FiringRecord),
    /// Conditions not met
    Hold,
}

/// Decides which cues fire at `game_time`.
///
/// Outside `InProgress` nothing fires and the records come back
/// unchanged. Records of cues no longer in `cues` are dropped.
#[must_use]
pub fn evaluate(
    phase: GamePhase,
    game_time: f64,
    cues: &[Cue],
    records: &FiringRecords,
    snapshot: &GameSnapshot,
) -> Evaluation {
    if phase != GamePhase::InProgress {
        return Evaluation {
            records: records.clone(),
            ..Evaluation::default()
        };
    }

    let mut next = FiringRecords::new();
    let mut decisions = Vec::new();
    let mut warnings = Vec::new();

    for cue in cues {
        let previous = records.get(&cue.id).copied();
        let rule = match cue.rule() {
            Ok(rule) => rule,
            Err(error) => {
                warnings.push(CueWarning {
                    cue_id: cue.id.clone(),
                    fingerprint: cue.fingerprint(),
                    error,
                });
                if let Some(prev) = previous {
                    next.insert(&cue.id, prev);
                }
                continue;
            }
        };

        match judge(&rule, previous, game_time, snapshot) {
            Verdict::Fire(record) => {
                next.insert(&cue.id, record);
                decisions.push(CueFireDecision {
                    cue: cue.clone(),
                    game_time,
                });
            }
            Verdict::Mark(record) => next.insert(&cue.id, record),
            Verdict::Hold => {
                if let Some(prev) = previous {
                    next.insert(&cue.id, prev);
                }
            }
        }
    }

    Evaluation {
        decisions,
        records: next,
        warnings,
    }
}

fn judge(
    rule: &TriggerRule,
    previous: Option<FiringRecord>,
    game_time: f64,
    snapshot: &GameSnapshot,
) -> Verdict {
    match rule {
        TriggerRule::Interval { every } => {
            #[allow(clippy::cast_precision_loss)]
            let every = *every as f64;
            let due = match previous {
                Some(FiringRecord::Interval { last_fired }) => game_time - last_fired >= every,
                // No record (or one left over from an edit to another kind)
                _ => game_time >= every,
            };
            if due {
                Verdict::Fire(FiringRecord::Interval {
                    last_fired: game_time,
                })
            } else {
                Verdict::Hold
            }
        }
        TriggerRule::OneTime { at } => {
            #[allow(clippy::cast_precision_loss)]
            let at = *at as f64;
            if previous != Some(FiringRecord::Fired) && game_time >= at {
                Verdict::Fire(FiringRecord::Fired)
            } else {
                Verdict::Hold
            }
        }
        TriggerRule::Event { name } => {
            if previous != Some(FiringRecord::Fired) && snapshot.has_event(name) {
                Verdict::Fire(FiringRecord::Fired)
            } else {
                Verdict::Hold
            }
        }
        TriggerRule::Objective { name, lead } => {
            let Some(timer) = snapshot.objective(name) else {
                return Verdict::Hold;
            };
            let already = matches!(
                previous,
                Some(FiringRecord::Objective { occurrence }) if occurrence == timer.occurrence
            );
            #[allow(clippy::cast_precision_loss)]
            let lead = *lead as f64;
            if already || timer.spawns_in > lead {
                Verdict::Hold
            } else if timer.spawns_in > -SPAWN_GRACE {
                Verdict::Fire(FiringRecord::Objective {
                    occurrence: timer.occurrence,
                })
            } else {
                // Already up when first seen: spend this occurrence silently
                Verdict::Mark(FiringRecord::Objective {
                    occurrence: timer.occurrence,
                })
            }
        }
    }
}
