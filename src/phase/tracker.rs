//! Game phase state machine.
//!
//! Turns a stream of noisy poll results into `NotStarted -> InProgress ->
//! Ended` with a monotonic session clock. The tracker owns no timers and
//! does no I/O; the scheduler feeds it one result per tick.

use tracing::{debug, info};

use crate::source::PollResult;

use super::state::{EndReason, GamePhase, PhaseEvent, Transition};

/// Default number of consecutive failed polls that end a session.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Derives the game phase from successive poll results.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    threshold: u32,
    phase: GamePhase,
    clock: f64,
    failures: u32,
    session: u64,
    /// Final clock of the last ended session
    ended_clock: f64,
    /// Whether a new session may start after `Ended`
    rearmed: bool,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD)
    }
}

impl PhaseTracker {
    /// Creates a tracker that ends a session after `failure_threshold`
    /// consecutive failed or absent polls. A threshold of zero is treated
    /// as one.
    #[must_use]
    pub fn new(failure_threshold: u32) -> Self {
        Self {
            threshold: failure_threshold.max(1),
            phase: GamePhase::NotStarted,
            clock: 0.0,
            failures: 0,
            session: 0,
            ended_clock: 0.0,
            rearmed: false,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Current session clock (zero outside a session).
    #[must_use]
    pub const fn game_time(&self) -> f64 {
        self.clock
    }

    /// Number of the current or most recent session; zero before the
    /// first.
    #[must_use]
    pub const fn session(&self) -> u64 {
        self.session
    }

    /// Consecutive failures counted in the current session.
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    /// Advances the state machine by one poll result.
    pub fn advance(&mut self, result: &PollResult) -> PhaseEvent {
        let previous = self.phase;
        let transition = match self.phase {
            GamePhase::NotStarted | GamePhase::Ended => self.advance_idle(result),
            GamePhase::InProgress => self.advance_running(result),
        };
        let game_time = match transition {
            Transition::SessionEnded { .. } => self.ended_clock,
            _ => self.clock,
        };
        PhaseEvent {
            previous,
            phase: self.phase,
            game_time,
            transition,
        }
    }

    fn advance_idle(&mut self, result: &PollResult) -> Transition {
        match result {
            Ok(snap) if snap.started && !snap.ended => {
                let fresh = self.phase == GamePhase::NotStarted
                    || self.rearmed
                    || snap.game_time < self.ended_clock;
                if !fresh {
                    // Same game still being reported after its end signal
                    return Transition::NoChange;
                }
                self.session += 1;
                self.phase = GamePhase::InProgress;
                self.clock = snap.game_time.max(0.0);
                self.failures = 0;
                self.rearmed = false;
                info!(
                    session = self.session,
                    game_time = self.clock,
                    "game session started"
                );
                Transition::SessionStarted {
                    session: self.session,
                }
            }
            Ok(snap) if snap.ended => Transition::NoChange,
            Ok(_) | Err(_) => {
                self.rearmed = true;
                Transition::NoChange
            }
        }
    }

    fn advance_running(&mut self, result: &PollResult) -> Transition {
        match result {
            Ok(snap) if snap.ended => self.end(EndReason::Signal),
            Err(e) if e.is_session_end() => self.end(EndReason::Signal),
            Ok(snap) if snap.started => {
                self.failures = 0;
                if snap.game_time < self.clock {
                    debug!(
                        reported = snap.game_time,
                        held = self.clock,
                        "stale game time ignored"
                    );
                } else {
                    self.clock = snap.game_time;
                }
                Transition::NoChange
            }
            Ok(_) | Err(_) => {
                self.failures += 1;
                debug!(
                    failures = self.failures,
                    threshold = self.threshold,
                    error = ?result.as_ref().err(),
                    "poll failed during session"
                );
                if self.failures >= self.threshold {
                    self.end(EndReason::Unavailable {
                        failures: self.failures,
                    })
                } else {
                    Transition::NoChange
                }
            }
        }
    }

    fn end(&mut self, reason: EndReason) -> Transition {
        info!(
            session = self.session,
            game_time = self.clock,
            %reason,
            "game session ended"
        );
        self.phase = GamePhase::Ended;
        self.ended_clock = self.clock;
        self.clock = 0.0;
        self.failures = 0;
        // A session lost to failures may resume as soon as data returns;
        // after an explicit end the same game must disappear first.
        self.rearmed = matches!(reason, EndReason::Unavailable { .. });
        Transition::SessionEnded {
            session: self.session,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::source::GameSnapshot;

    fn running(t: f64) -> PollResult {
        Ok(GameSnapshot::at(t))
    }

    fn loading() -> PollResult {
        Ok(GameSnapshot::default())
    }

    fn ended(t: f64) -> PollResult {
        Ok(GameSnapshot {
            ended: true,
            ..GameSnapshot::at(t)
        })
    }

    fn transitions(tracker: &mut PhaseTracker, results: &[PollResult]) -> Vec<Transition> {
        results
            .iter()
            .map(|r| tracker.advance(r).transition)
            .filter(Transition::is_change)
            .collect()
    }

    #[test]
    fn test_not_started_until_started_snapshot() {
        let mut tracker = PhaseTracker::default();
        for r in [loading(), Err(SourceError::NotInGame), loading()] {
            let ev = tracker.advance(&r);
            assert_eq!(ev.phase, GamePhase::NotStarted);
            assert_eq!(ev.transition, Transition::NoChange);
        }
    }

    #[test]
    fn test_single_session_started() {
        let mut tracker = PhaseTracker::default();
        let seen = transitions(&mut tracker, &[
            loading(),
            running(1.0),
            running(2.0),
            running(3.0),
        ]);
        assert_eq!(seen, [Transition::SessionStarted { session: 1 }]);
        assert!((tracker.game_time() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_threshold_failures_end_session_once() {
        let mut tracker = PhaseTracker::new(3);
        tracker.advance(&running(10.0));
        let seen = transitions(&mut tracker, &[
            Err(SourceError::NotInGame),
            Err(SourceError::Transport("reset".to_string())),
            Err(SourceError::Timeout(std::time::Duration::from_secs(2))),
            Err(SourceError::NotInGame),
            Err(SourceError::NotInGame),
        ]);
        assert_eq!(seen, [Transition::SessionEnded {
            session: 1,
            reason: EndReason::Unavailable { failures: 3 },
        }]);
        assert_eq!(tracker.phase(), GamePhase::Ended);
    }

    #[test]
    fn test_below_threshold_failures_then_success() {
        let mut tracker = PhaseTracker::new(3);
        tracker.advance(&running(10.0));
        let seen = transitions(&mut tracker, &[
            Err(SourceError::NotInGame),
            loading(),
            running(13.0),
            Err(SourceError::NotInGame),
            Err(SourceError::NotInGame),
            running(16.0),
        ]);
        assert!(seen.is_empty());
        assert_eq!(tracker.phase(), GamePhase::InProgress);
    }

    #[test]
    fn test_game_ended_is_immediate() {
        let mut tracker = PhaseTracker::new(5);
        tracker.advance(&running(10.0));
        let ev = tracker.advance(&Err(SourceError::GameEnded));
        assert_eq!(ev.phase, GamePhase::Ended);
        assert!((ev.game_time - 10.0).abs() < f64::EPSILON);

        let mut tracker = PhaseTracker::new(5);
        tracker.advance(&running(10.0));
        let ev = tracker.advance(&ended(11.0));
        assert_eq!(ev.transition, Transition::SessionEnded {
            session: 1,
            reason: EndReason::Signal,
        });
    }

    #[test]
    fn test_clock_never_regresses() {
        let mut tracker = PhaseTracker::default();
        tracker.advance(&running(100.0));
        let ev = tracker.advance(&running(95.0));
        assert!((ev.game_time - 100.0).abs() < f64::EPSILON);
        let ev = tracker.advance(&running(101.0));
        assert!((ev.game_time - 101.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ended_game_still_reported_does_not_restart() {
        let mut tracker = PhaseTracker::default();
        tracker.advance(&running(1000.0));
        tracker.advance(&Err(SourceError::GameEnded));
        // Client keeps serving the final state without the end marker
        let seen = transitions(&mut tracker, &[running(1001.0), running(1002.0)]);
        assert!(seen.is_empty());
        assert_eq!(tracker.phase(), GamePhase::Ended);
    }

    #[test]
    fn test_new_session_after_absence() {
        let mut tracker = PhaseTracker::default();
        tracker.advance(&running(1000.0));
        tracker.advance(&ended(1001.0));
        let seen = transitions(&mut tracker, &[
            ended(1001.0),
            Err(SourceError::NotInGame),
            loading(),
            running(2.0),
        ]);
        assert_eq!(seen, [Transition::SessionStarted { session: 2 }]);
        assert!((tracker.game_time() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_new_session_detected_by_clock_reset() {
        let mut tracker = PhaseTracker::default();
        tracker.advance(&running(1000.0));
        tracker.advance(&ended(1000.0));
        let ev = tracker.advance(&running(5.0));
        assert_eq!(ev.transition, Transition::SessionStarted { session: 2 });
    }

    #[test]
    fn test_session_lost_to_failures_resumes() {
        let mut tracker = PhaseTracker::new(2);
        tracker.advance(&running(500.0));
        tracker.advance(&Err(SourceError::NotInGame));
        tracker.advance(&Err(SourceError::NotInGame));
        assert_eq!(tracker.phase(), GamePhase::Ended);
        let ev = tracker.advance(&running(510.0));
        assert_eq!(ev.transition, Transition::SessionStarted { session: 2 });
    }

    #[test]
    fn test_zero_threshold_treated_as_one() {
        let mut tracker = PhaseTracker::new(0);
        tracker.advance(&running(1.0));
        let ev = tracker.advance(&Err(SourceError::NotInGame));
        assert_eq!(ev.phase, GamePhase::Ended);
    }
}
