//! One tick of the engine, minus the timing.
//!
//! [`TickDriver`] owns the phase tracker, the firing records and the
//! warning ledger. The scheduler feeds it one poll result per tick; tests
//! can do the same without a clock.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::cue::CueStore;
use crate::dispatch::Dispatcher;
use crate::observability::{Event, EventEmitter, metrics};
use crate::phase::{GamePhase, PhaseEvent, PhaseTracker, Transition};
use crate::source::{GameSnapshot, PollResult};
use crate::trigger::{FiringRecords, WarningLedger, evaluate};

use super::notify::{Notification, Notifier};

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// Phase tracker output
    pub phase: PhaseEvent,
    /// Ids of cues that fired, in dispatch order
    pub fired: Vec<String>,
}

/// Poll result in, phase transition and firings out.
#[derive(Debug)]
pub struct TickDriver {
    tracker: PhaseTracker,
    records: FiringRecords,
    ledger: WarningLedger,
    store: CueStore,
    dispatcher: Dispatcher,
    notifier: Notifier,
    emitter: Arc<EventEmitter>,
}

impl TickDriver {
    /// Creates a driver reading cues from `store`.
    #[must_use]
    pub fn new(
        tracker: PhaseTracker,
        store: CueStore,
        dispatcher: Dispatcher,
        notifier: Notifier,
        emitter: Arc<EventEmitter>,
    ) -> Self {
        Self {
            tracker,
            records: FiringRecords::new(),
            ledger: WarningLedger::new(),
            store,
            dispatcher,
            notifier,
            emitter,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> GamePhase {
        self.tracker.phase()
    }

    /// Firing records of the current session.
    #[must_use]
    pub const fn records(&self) -> &FiringRecords {
        &self.records
    }

    /// The live cue store.
    #[must_use]
    pub const fn store(&self) -> &CueStore {
        &self.store
    }

    /// Processes one poll result.
    ///
    /// Cues are only evaluated on a successful poll while a session is in
    /// progress; a failed poll carries no new game state.
    pub fn on_poll(&mut self, result: PollResult) -> TickOutcome {
        if let Err(e) = &result {
            metrics::record_poll_failure(e.kind());
            debug!(kind = e.kind(), error = %e, "poll failed");
            self.emitter.emit(Event::PollFailed {
                timestamp: Utc::now(),
                kind: e.kind().to_string(),
                message: e.to_string(),
            });
        }

        let phase = self.tracker.advance(&result);
        self.apply_transition(&phase);

        let fired = match (&result, phase.phase) {
            (Ok(snapshot), GamePhase::InProgress) => self.evaluate(phase.game_time, snapshot),
            _ => Vec::new(),
        };

        self.emitter.flush();
        TickOutcome { phase, fired }
    }

    fn apply_transition(&mut self, phase: &PhaseEvent) {
        match phase.transition {
            Transition::NoChange => return,
            Transition::SessionStarted { session } => {
                self.records = FiringRecords::new();
                self.emitter.emit(Event::SessionStarted {
                    timestamp: Utc::now(),
                    session,
                    game_time: phase.game_time,
                });
            }
            Transition::SessionEnded { session, reason } => {
                self.records = FiringRecords::new();
                metrics::set_game_time(0.0);
                self.emitter.emit(Event::SessionEnded {
                    timestamp: Utc::now(),
                    session,
                    game_time: phase.game_time,
                    reason: reason.to_string(),
                });
            }
        }
        metrics::record_session_transition(phase.transition.label());
        self.notifier.send(Notification::PhaseChanged {
            from: phase.previous,
            to: phase.phase,
            transition: phase.transition,
            game_time: phase.game_time,
        });
    }

    fn evaluate(&mut self, game_time: f64, snapshot: &GameSnapshot) -> Vec<String> {
        metrics::set_game_time(game_time);

        // One consistent pack for the whole tick
        let pack = self.store.snapshot();
        let evaluation = evaluate(
            GamePhase::InProgress,
            game_time,
            &pack.cues,
            &self.records,
            snapshot,
        );
        self.records = evaluation.records;

        self.ledger.retain(pack.cues.iter().map(|c| c.id.as_str()));
        for w in self.ledger.fresh(&evaluation.warnings) {
            let message = w.error.to_string();
            warn!(cue_id = %w.cue_id, %message, "cue will not fire until it is fixed");
            self.emitter.emit(Event::CueConfigWarning {
                timestamp: Utc::now(),
                cue_id: w.cue_id.clone(),
                message: message.clone(),
            });
            self.notifier.send(Notification::ConfigurationWarning {
                cue_id: w.cue_id.clone(),
                message,
            });
        }

        let fired: Vec<String> = evaluation
            .decisions
            .iter()
            .map(|d| {
                metrics::record_cue_fired(d.trigger().as_str());
                debug!(cue_id = %d.cue.id, trigger = %d.trigger(), game_time, "cue fired");
                d.cue.id.clone()
            })
            .collect();

        self.dispatcher.dispatch(evaluation.decisions);
        fired
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::cue::{Cue, CuePack, TriggerRule, TriggerType};
    use crate::dispatch::{LogPlayer, PlaybackQueue, SpeechSynthesizer};
    use crate::error::{SourceError, SynthesisError};

    #[derive(Default)]
    struct FakeSynth(AtomicUsize);

    #[async_trait]
    impl SpeechSynthesizer for FakeSynth {
        async fn generate(&self, text: &str) -> Result<PathBuf, SynthesisError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(PathBuf::from(format!("{text}.wav")))
        }
    }

    fn driver(cues: Vec<Cue>) -> (TickDriver, Notifier) {
        let mut pack = CuePack::personal();
        pack.cues = cues;
        let store = CueStore::new(pack);
        let notifier = Notifier::default();
        let emitter = Arc::new(EventEmitter::noop());
        let (queue, _) = PlaybackQueue::spawn(Arc::new(LogPlayer), CancellationToken::new()).unwrap();
        let dispatcher = Dispatcher::new(
            Arc::new(FakeSynth::default()),
            queue,
            Arc::new(store.clone()),
            notifier.clone(),
            Arc::clone(&emitter),
        );
        let driver = TickDriver::new(
            PhaseTracker::new(3),
            store,
            dispatcher,
            notifier.clone(),
            emitter,
        );
        (driver, notifier)
    }

    fn at(t: f64) -> PollResult {
        Ok(GameSnapshot::at(t))
    }

    #[tokio::test]
    async fn test_records_reset_between_sessions() {
        let (mut d, _) = driver(vec![Cue::with_id("a", "a", &TriggerRule::OneTime {
            at: 10,
        })]);

        assert_eq!(d.on_poll(at(12.0)).fired, ["a"]);
        assert!(d.on_poll(at(13.0)).fired.is_empty());

        d.on_poll(Err(SourceError::GameEnded));
        assert!(d.records().is_empty());
        d.on_poll(Err(SourceError::NotInGame));

        // New game: the one-time cue is eligible again
        let outcome = d.on_poll(at(15.0));
        assert_eq!(outcome.phase.transition, Transition::SessionStarted { session: 2 });
        assert_eq!(outcome.fired, ["a"]);
    }

    #[tokio::test]
    async fn test_failed_poll_does_not_evaluate() {
        let (mut d, _) = driver(vec![Cue::with_id("a", "a", &TriggerRule::Interval {
            every: 1,
        })]);
        d.on_poll(at(5.0));
        let outcome = d.on_poll(Err(SourceError::Transport("reset".to_string())));
        assert_eq!(outcome.phase.phase, GamePhase::InProgress);
        assert!(outcome.fired.is_empty());
    }

    #[tokio::test]
    async fn test_phase_changes_are_notified() {
        let (mut d, notifier) = driver(Vec::new());
        let mut rx = notifier.subscribe();
        d.on_poll(at(1.0));
        d.on_poll(at(2.0));
        d.on_poll(Err(SourceError::GameEnded));

        let mut seen = Vec::new();
        while let Ok(n) = rx.try_recv() {
            if let Notification::PhaseChanged { to, .. } = n {
                seen.push(to);
            }
        }
        assert_eq!(seen, [GamePhase::InProgress, GamePhase::Ended]);
    }

    #[tokio::test]
    async fn test_invalid_cue_warned_once_until_edited() {
        let mut broken = Cue::with_id("b", "b", &TriggerRule::Interval { every: 5 });
        broken.interval = None;
        let (mut d, notifier) = driver(vec![broken.clone()]);
        let mut rx = notifier.subscribe();

        for t in [1.0, 2.0, 3.0] {
            d.on_poll(at(t));
        }

        // Edit, still broken: reported again
        d.store().update(|p| {
            let cue = p.cue_mut("b").unwrap();
            cue.trigger_type = TriggerType::Objective;
            cue.objective = Some("dragon".to_string());
        });
        d.on_poll(at(4.0));
        d.on_poll(at(5.0));

        let mut warnings = 0;
        while let Ok(n) = rx.try_recv() {
            if matches!(n, Notification::ConfigurationWarning { .. }) {
                warnings += 1;
            }
        }
        assert_eq!(warnings, 2);
    }

    #[tokio::test]
    async fn test_edit_between_ticks_is_seen_next_tick() {
        let (mut d, _) = driver(Vec::new());
        d.on_poll(at(100.0));
        d.store().update(|p| {
            p.push_cue(Cue::with_id("late", "late", &TriggerRule::OneTime { at: 50 }));
        });
        assert_eq!(d.on_poll(at(101.0)).fired, ["late"]);
    }
}
