//! Property tests for the evaluator and the phase tracker.

use cuecaller::cue::{Cue, TriggerRule};
use cuecaller::error::SourceError;
use cuecaller::phase::{GamePhase, PhaseTracker, Transition};
use cuecaller::source::{GameSnapshot, ObjectiveTimer, PollResult};
use cuecaller::trigger::{FiringRecords, SPAWN_GRACE, evaluate};
use proptest::prelude::*;

/// Strictly increasing game times built from positive steps.
fn clock(steps: &[u16]) -> Vec<f64> {
    let mut now = 0.0;
    steps
        .iter()
        .map(|s| {
            now += f64::from(*s) / 10.0;
            now
        })
        .collect()
}

/// Runs a single cue over `times`, returning the times it fired at.
fn firings(cue: &Cue, times: &[f64], snapshot: impl Fn(f64) -> GameSnapshot) -> Vec<f64> {
    let cues = std::slice::from_ref(cue);
    let mut records = FiringRecords::new();
    let mut fired = Vec::new();
    for &t in times {
        let eval = evaluate(GamePhase::InProgress, t, cues, &records, &snapshot(t));
        if !eval.decisions.is_empty() {
            fired.push(t);
        }
        records = eval.records;
    }
    fired
}

fn poll_result() -> impl Strategy<Value = PollResult> {
    prop_oneof![
        4 => (0u32..4_000).prop_map(|t| Ok(GameSnapshot::at(f64::from(t)))),
        1 => Just(Err(SourceError::NotInGame)),
        1 => Just(Err(SourceError::Transport("refused".to_string()))),
        1 => Just(Err(SourceError::GameEnded)),
    ]
}

proptest! {
    #[test]
    fn interval_firings_are_at_least_a_period_apart(
        every in 1u64..120,
        steps in prop::collection::vec(1u16..400, 1..200),
    ) {
        let cue = Cue::with_id("i", "interval", &TriggerRule::Interval { every });
        let times = clock(&steps);
        let fired = firings(&cue, &times, GameSnapshot::at);

        #[allow(clippy::cast_precision_loss)]
        let every = every as f64;
        for pair in fired.windows(2) {
            prop_assert!(pair[1] - pair[0] >= every);
        }
        if let Some(first) = fired.first() {
            prop_assert!(*first >= every);
        }
        // Fires by the first tick at or past one period
        let last = times[times.len() - 1];
        if last >= every {
            prop_assert!(!fired.is_empty());
        }
    }

    #[test]
    fn one_time_fires_once_iff_reached(
        at in 0u64..600,
        steps in prop::collection::vec(1u16..400, 1..100),
    ) {
        let cue = Cue::with_id("o", "one time", &TriggerRule::OneTime { at });
        let times = clock(&steps);
        let fired = firings(&cue, &times, GameSnapshot::at);

        #[allow(clippy::cast_precision_loss)]
        let reached = times.iter().any(|t| *t >= at as f64);
        prop_assert_eq!(fired.len(), usize::from(reached));
    }

    #[test]
    fn objective_fires_once_per_occurrence(
        lead in 0u64..90,
        countdown in prop::collection::vec((0u64..4, -30i32..300), 1..120),
    ) {
        let cue = Cue::with_id("d", "drake", &TriggerRule::Objective {
            name: "dragon".to_string(),
            lead,
        });
        // Occurrences only move forward
        let mut occurrence = 0;
        let timers: Vec<(u64, f64)> = countdown
            .iter()
            .map(|(bump, spawns_in)| {
                occurrence += bump;
                (occurrence, f64::from(*spawns_in))
            })
            .collect();

        let cues = std::slice::from_ref(&cue);
        let mut records = FiringRecords::new();
        let mut fired_for = Vec::new();
        let mut now = 0.0;
        for (occurrence, spawns_in) in &timers {
            now += 1.0;
            let snapshot = GameSnapshot {
                objectives: vec![ObjectiveTimer {
                    name: "Dragon".to_string(),
                    spawns_in: *spawns_in,
                    occurrence: *occurrence,
                }],
                ..GameSnapshot::at(now)
            };
            #[allow(clippy::cast_precision_loss)]
            let due = *spawns_in <= lead as f64;
            let eval = evaluate(GamePhase::InProgress, now, cues, &records, &snapshot);
            if !eval.decisions.is_empty() {
                prop_assert!(due);
                prop_assert!(*spawns_in > -SPAWN_GRACE, "announced {spawns_in}s after spawn");
                fired_for.push(*occurrence);
            }
            records = eval.records;
        }

        let mut distinct = fired_for.clone();
        distinct.dedup();
        prop_assert_eq!(distinct, fired_for);
    }

    #[test]
    fn spawned_objective_is_never_announced_on_fresh_records(
        lead in 0u64..600,
        past in 2u32..4_000,
    ) {
        let cue = Cue::with_id("d", "drake", &TriggerRule::Objective {
            name: "dragon".to_string(),
            lead,
        });
        let snapshot = GameSnapshot {
            objectives: vec![ObjectiveTimer {
                name: "dragon".to_string(),
                spawns_in: -f64::from(past),
                occurrence: 0,
            }],
            ..GameSnapshot::at(4_000.0)
        };
        let first = evaluate(GamePhase::InProgress, 4_000.0, std::slice::from_ref(&cue), &FiringRecords::new(), &snapshot);
        prop_assert!(first.decisions.is_empty());
        let again = evaluate(GamePhase::InProgress, 4_001.0, std::slice::from_ref(&cue), &first.records, &snapshot);
        prop_assert!(again.decisions.is_empty());
    }

    #[test]
    fn nothing_fires_outside_a_session(
        game_time in 0u32..4_000,
        phase in prop_oneof![Just(GamePhase::NotStarted), Just(GamePhase::Ended)],
    ) {
        let cues = [
            Cue::with_id("a", "a", &TriggerRule::Interval { every: 1 }),
            Cue::with_id("b", "b", &TriggerRule::OneTime { at: 0 }),
        ];
        let records = FiringRecords::new();
        let eval = evaluate(phase, f64::from(game_time), &cues, &records, &GameSnapshot::at(f64::from(game_time)));
        prop_assert!(eval.decisions.is_empty());
        prop_assert_eq!(eval.records, records);
    }

    #[test]
    fn session_clock_never_goes_backwards(
        polls in prop::collection::vec(poll_result(), 1..300),
        threshold in 1u32..5,
    ) {
        let mut tracker = PhaseTracker::new(threshold);
        let mut last: Option<f64> = None;
        for poll in &polls {
            let event = tracker.advance(poll);
            match (event.transition, event.phase) {
                (Transition::SessionStarted { .. }, _) => last = Some(event.game_time),
                (Transition::SessionEnded { .. }, _) => last = None,
                (Transition::NoChange, GamePhase::InProgress) => {
                    let now = event.game_time;
                    if let Some(prev) = last {
                        prop_assert!(now >= prev, "clock went from {prev} to {now}");
                    }
                    last = Some(now);
                }
                (Transition::NoChange, _) => {}
            }
            prop_assert!(tracker.consecutive_failures() < threshold);
        }
    }

    #[test]
    fn sessions_alternate_start_and_end(
        polls in prop::collection::vec(poll_result(), 1..300),
    ) {
        let mut tracker = PhaseTracker::default();
        let mut open = false;
        let mut started = 0;
        for poll in &polls {
            match tracker.advance(poll).transition {
                Transition::SessionStarted { session } => {
                    prop_assert!(!open);
                    started += 1;
                    prop_assert_eq!(session, started);
                    open = true;
                }
                Transition::SessionEnded { session, .. } => {
                    prop_assert!(open);
                    prop_assert_eq!(session, started);
                    open = false;
                }
                Transition::NoChange => {}
            }
        }
        prop_assert_eq!(open, tracker.phase() == GamePhase::InProgress);
    }
}
