//! Objective timers derived from configured metadata.
//!
//! The live client reports kills but not spawn timers, so timers are
//! reconstructed from user-supplied metadata: when an objective first
//! spawns, how long it takes to respawn, and which event marks a kill.
//! No respawn constants are built in.

use serde::{Deserialize, Serialize};

use super::{GameEvent, ObjectiveTimer};

/// Metadata for one tracked objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveSpec {
    /// Name cues refer to (`objective: dragon`)
    pub name: String,
    /// Event that marks a kill, e.g. `DragonKill`
    pub kill_event: String,
    /// Game time of the first spawn, in seconds
    pub first_spawn: u64,
    /// Seconds from a kill to the next spawn
    pub respawn: u64,
}

/// Computes [`ObjectiveTimer`]s from the events seen so far.
#[derive(Debug, Clone, Default)]
pub struct ObjectiveClock {
    specs: Vec<ObjectiveSpec>,
}

impl ObjectiveClock {
    /// Creates a clock for the given objectives.
    #[must_use]
    pub const fn new(specs: Vec<ObjectiveSpec>) -> Self {
        Self { specs }
    }

    /// One timer per configured objective at `game_time`.
    ///
    /// The occurrence is the number of kills seen, so it advances exactly
    /// when a new spawn cycle starts.
    #[must_use]
    pub fn timers(&self, game_time: f64, events: &[GameEvent]) -> Vec<ObjectiveTimer> {
        self.specs
            .iter()
            .map(|spec| {
                let kills = events
                    .iter()
                    .filter(|e| e.name.eq_ignore_ascii_case(&spec.kill_event));
                let (occurrence, last_kill) = kills.fold((0_u64, None), |(n, last), e| {
                    let last = match last {
                        Some(t) if t >= e.time => Some(t),
                        _ => Some(e.time),
                    };
                    (n + 1, last)
                });
                #[allow(clippy::cast_precision_loss)]
                let next_spawn = last_kill.map_or(spec.first_spawn as f64, |t| {
                    t + spec.respawn as f64
                });
                ObjectiveTimer {
                    name: spec.name.clone(),
                    spawns_in: next_spawn - game_time,
                    occurrence,
                }
            })
            .collect()
    }
}
