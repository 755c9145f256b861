//! Cue dispatch.
//!
//! Each tick's firings become one background task. Audio for every cue in
//! the batch is resolved concurrently, then queued for playback in the
//! order the evaluator returned them. The polling loop only spawns the
//! task; it never waits for synthesis or playback.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::sync::OnceCell;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::cue::Cue;
use crate::engine::notify::{Notification, Notifier};
use crate::error::SynthesisError;
use crate::observability::{Event, EventEmitter, metrics};
use crate::trigger::CueFireDecision;

use super::playback::PlaybackQueue;
use super::synth::SpeechSynthesizer;

/// Where synthesised audio paths are remembered beyond this process.
pub trait AudioRecorder: Send + Sync {
    /// Stores `path` on the cue if its text is still `text`.
    fn record_audio(&self, cue_id: &str, text: &str, path: &str);
}

impl AudioRecorder for crate::cue::CueStore {
    fn record_audio(&self, cue_id: &str, text: &str, path: &str) {
        let _ = Self::record_audio(self, cue_id, text, path);
    }
}

impl AudioRecorder for crate::cue::PackService {
    fn record_audio(&self, cue_id: &str, text: &str, path: &str) {
        Self::record_audio(self, cue_id, text, path);
    }
}

/// One audio slot per (cue id, text); concurrent firings share it.
type AudioCache = DashMap<(String, String), Arc<OnceCell<PathBuf>>>;

struct Inner {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    playback: PlaybackQueue,
    recorder: Arc<dyn AudioRecorder>,
    notifier: Notifier,
    emitter: Arc<EventEmitter>,
    cache: AudioCache,
}

/// Resolves audio for fired cues and hands it to playback.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
    tracker: TaskTracker,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("cached_audio", &self.inner.cache.len())
            .field("in_flight", &self.tracker.len())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        playback: PlaybackQueue,
        recorder: Arc<dyn AudioRecorder>,
        notifier: Notifier,
        emitter: Arc<EventEmitter>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                synthesizer,
                playback,
                recorder,
                notifier,
                emitter,
                cache: DashMap::new(),
            }),
            tracker: TaskTracker::new(),
        }
    }

    /// Dispatches one tick's firings in the background.
    ///
    /// Must be called from within a Tokio runtime. Returns immediately.
    pub fn dispatch(&self, decisions: Vec<CueFireDecision>) {
        if decisions.is_empty() {
            return;
        }
        let fired_at = Utc::now();
        let inner = Arc::clone(&self.inner);
        self.tracker
            .spawn(async move { inner.run_batch(decisions, fired_at).await });
    }

    /// Tracker of in-flight dispatch tasks.
    #[must_use]
    pub const fn tasks(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Waits until every dispatch spawned so far has finished.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

impl Inner {
    async fn run_batch(&self, decisions: Vec<CueFireDecision>, fired_at: DateTime<Utc>) {
        let resolved = join_all(decisions.iter().map(|d| self.resolve_audio(&d.cue))).await;

        for (decision, audio) in decisions.into_iter().zip(resolved) {
            let cue = decision.cue;
            match audio {
                Ok(path) => {
                    let audio_path = path.to_string_lossy().into_owned();
                    if !self.playback.enqueue(path).await {
                        warn!(cue_id = %cue.id, "playback worker stopped; clip dropped");
                    }
                    self.emitter.emit(Event::CueFired {
                        timestamp: fired_at,
                        cue_id: cue.id.clone(),
                        trigger: cue.trigger_type.to_string(),
                        game_time: decision.game_time,
                        audio_path: audio_path.clone(),
                    });
                    self.notifier.send(Notification::CueFired {
                        cue_id: cue.id,
                        text: cue.text,
                        audio_path,
                        fired_at,
                        game_time: decision.game_time,
                    });
                }
                Err(e) => {
                    warn!(cue_id = %cue.id, error = %e, "cue firing dropped: synthesis failed");
                    self.emitter.emit(Event::DispatchFailed {
                        timestamp: Utc::now(),
                        cue_id: cue.id.clone(),
                        error: e.to_string(),
                    });
                    self.notifier.send(Notification::DispatchFailed {
                        cue_id: cue.id,
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    /// Cached path if the cue has one, otherwise synthesise once per
    /// (cue, text) and remember the result.
    async fn resolve_audio(&self, cue: &Cue) -> Result<PathBuf, SynthesisError> {
        if let Some(url) = &cue.audio_url {
            return Ok(PathBuf::from(url));
        }

        let cell = self
            .cache
            .entry((cue.id.clone(), cue.text.clone()))
            .or_default()
            .clone();

        if let Some(path) = cell.get() {
            metrics::record_synthesis("cached");
            return Ok(path.clone());
        }

        let path = cell
            .get_or_try_init(|| async {
                debug!(cue_id = %cue.id, "synthesising cue audio");
                match self.synthesizer.generate(&cue.text).await {
                    Ok(path) => {
                        metrics::record_synthesis("ok");
                        self.write_back(cue, &path).await;
                        Ok(path)
                    }
                    Err(e) => {
                        metrics::record_synthesis("error");
                        Err(e)
                    }
                }
            })
            .await?;
        Ok(path.clone())
    }

    /// Records a fresh clip on the cue. Recorders may write pack files, so
    /// this runs on the blocking pool.
    async fn write_back(&self, cue: &Cue, path: &std::path::Path) {
        let recorder = Arc::clone(&self.recorder);
        let (cue_id, text) = (cue.id.clone(), cue.text.clone());
        let path = path.to_string_lossy().into_owned();
        let recorded =
            tokio::task::spawn_blocking(move || recorder.record_audio(&cue_id, &text, &path)).await;
        if let Err(e) = recorded {
            warn!(cue_id = %cue.id, error = %e, "recording cue audio failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::cue::{CuePack, CueStore, TriggerRule};
    use crate::dispatch::playback::AudioPlayer;
    use crate::error::PlaybackError;

    #[derive(Default)]
    struct CountingSynth {
        calls: AtomicUsize,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl SpeechSynthesizer for CountingSynth {
        async fn generate(&self, text: &str) -> Result<PathBuf, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            if self.fail_on == Some(text) {
                return Err(SynthesisError::SpawnFailed("no voice".to_string()));
            }
            Ok(PathBuf::from(format!("audio/{text}.wav")))
        }
    }

    #[derive(Default)]
    struct Played(Mutex<Vec<PathBuf>>);

    #[async_trait]
    impl AudioPlayer for Played {
        async fn play(&self, path: &Path) -> Result<(), PlaybackError> {
            self.0.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    struct Harness {
        dispatcher: Dispatcher,
        synth: Arc<CountingSynth>,
        played: Arc<Played>,
        store: CueStore,
        notifier: Notifier,
    }

    fn harness(synth: CountingSynth, cues: Vec<Cue>) -> Harness {
        let mut pack = CuePack::personal();
        pack.cues = cues;
        let store = CueStore::new(pack);
        let synth = Arc::new(synth);
        let played = Arc::new(Played::default());
        let (queue, _worker) = PlaybackQueue::spawn(played.clone(), CancellationToken::new()).unwrap();
        let notifier = Notifier::default();
        let dispatcher = Dispatcher::new(
            synth.clone(),
            queue,
            Arc::new(store.clone()),
            notifier.clone(),
            Arc::new(EventEmitter::noop()),
        );
        Harness {
            dispatcher,
            synth,
            played,
            store,
            notifier,
        }
    }

    fn decision(cue: &Cue, game_time: f64) -> CueFireDecision {
        CueFireDecision {
            cue: cue.clone(),
            game_time,
        }
    }

    async fn settle(h: &Harness) {
        h.dispatcher.wait_idle().await;
        // Let the playback worker drain
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_synthesis_once_per_cue_across_firings() {
        let cue = Cue::with_id("a", "ward", &TriggerRule::Interval { every: 30 });
        let h = harness(CountingSynth::default(), vec![cue.clone()]);

        // Two overlapping firings from stale snapshots share one synthesis
        h.dispatcher.dispatch(vec![decision(&cue, 30.0)]);
        h.dispatcher.dispatch(vec![decision(&cue, 60.0)]);
        settle(&h).await;

        assert_eq!(h.synth.calls.load(Ordering::SeqCst), 1);
        let stored = h.store.snapshot();
        assert_eq!(
            stored.cue("a").unwrap().audio_url.as_deref(),
            Some("audio/ward.wav")
        );

        // Later firings read the stored path
        let refreshed = stored.cue("a").unwrap().clone();
        h.dispatcher.dispatch(vec![decision(&refreshed, 90.0)]);
        settle(&h).await;
        assert_eq!(h.synth.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.played.0.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_batch_plays_in_decision_order() {
        let cues: Vec<Cue> = ["z", "m", "a"]
            .iter()
            .map(|id| Cue::with_id(*id, *id, &TriggerRule::OneTime { at: 60 }))
            .collect();
        let h = harness(CountingSynth::default(), cues.clone());
        let mut rx = h.notifier.subscribe();

        h.dispatcher
            .dispatch(cues.iter().map(|c| decision(c, 60.0)).collect());
        settle(&h).await;

        let played: Vec<_> = h.played.0.lock().unwrap().clone();
        assert_eq!(played, [
            PathBuf::from("audio/z.wav"),
            PathBuf::from("audio/m.wav"),
            PathBuf::from("audio/a.wav"),
        ]);
        for expected in ["z", "m", "a"] {
            match rx.recv().await.unwrap() {
                Notification::CueFired { cue_id, .. } => assert_eq!(cue_id, expected),
                other => panic!("unexpected notification {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_failed_synthesis_drops_only_that_cue() {
        let bad = Cue::with_id("bad", "broken", &TriggerRule::OneTime { at: 1 });
        let good = Cue::with_id("good", "fine", &TriggerRule::OneTime { at: 1 });
        let h = harness(
            CountingSynth {
                fail_on: Some("broken"),
                ..CountingSynth::default()
            },
            vec![bad.clone(), good.clone()],
        );
        let mut rx = h.notifier.subscribe();

        h.dispatcher
            .dispatch(vec![decision(&bad, 1.0), decision(&good, 1.0)]);
        settle(&h).await;

        assert_eq!(*h.played.0.lock().unwrap(), [PathBuf::from("audio/fine.wav")]);
        assert!(matches!(
            rx.recv().await.unwrap(),
            Notification::DispatchFailed { cue_id, .. } if cue_id == "bad"
        ));
        assert!(h.store.snapshot().cue("bad").unwrap().audio_url.is_none());
    }

    #[tokio::test]
    async fn test_text_edit_gets_fresh_audio() {
        let cue = Cue::with_id("a", "ward", &TriggerRule::Interval { every: 30 });
        let h = harness(CountingSynth::default(), vec![cue.clone()]);
        h.dispatcher.dispatch(vec![decision(&cue, 30.0)]);
        settle(&h).await;

        let mut edited = cue;
        edited.text = "sweep".to_string();
        h.dispatcher.dispatch(vec![decision(&edited, 60.0)]);
        settle(&h).await;
        assert_eq!(h.synth.calls.load(Ordering::SeqCst), 2);
    }

    /// Recorder that blocks its thread the way a pack file write does.
    #[derive(Default)]
    struct SlowRecorder(AtomicUsize);

    impl AudioRecorder for SlowRecorder {
        fn record_audio(&self, _cue_id: &str, _text: &str, _path: &str) {
            std::thread::sleep(Duration::from_millis(200));
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_audio_write_back_leaves_runtime_free() {
        let cue = Cue::with_id("a", "ward", &TriggerRule::Interval { every: 30 });
        let recorder = Arc::new(SlowRecorder::default());
        let (queue, _worker) =
            PlaybackQueue::spawn(Arc::new(Played::default()), CancellationToken::new()).unwrap();
        let dispatcher = Dispatcher::new(
            Arc::new(CountingSynth::default()),
            queue,
            recorder.clone(),
            Notifier::default(),
            Arc::new(EventEmitter::noop()),
        );

        // Single-threaded runtime: the ticker only advances while the
        // write-back is off the runtime thread
        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = tokio::spawn({
            let ticks = Arc::clone(&ticks);
            async move {
                loop {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        dispatcher.dispatch(vec![decision(&cue, 30.0)]);
        dispatcher.wait_idle().await;
        ticker.abort();

        assert_eq!(recorder.0.load(Ordering::SeqCst), 1);
        let ticks = ticks.load(Ordering::SeqCst);
        assert!(ticks >= 5, "runtime stalled during write-back ({ticks} ticks)");
    }

    #[tokio::test]
    async fn test_empty_batch_spawns_nothing() {
        let h = harness(CountingSynth::default(), Vec::new());
        h.dispatcher.dispatch(Vec::new());
        assert!(h.dispatcher.tasks().is_empty());
    }
}
