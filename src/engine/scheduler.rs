//! The polling loop.
//!
//! One background task ticks at a fixed period. Each tick polls the live
//! data source with a timeout and hands the result to the
//! [`TickDriver`]. Ticks never overlap: a slow poll delays the next tick
//! and ticks missed meanwhile are skipped, not bunched up.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{EngineError, SourceError};
use crate::observability::{Event, EventEmitter, metrics};
use crate::source::LiveDataSource;

use super::notify::{Notification, Notifier};
use super::tick::TickDriver;

/// Default polling period.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(1);

/// Default per-poll timeout.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(2);

/// Timing knobs for the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between tick starts
    pub poll_period: Duration,
    /// A poll taking longer counts as a failed poll
    pub poll_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_period: DEFAULT_POLL_PERIOD,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// Lifecycle of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Never started
    Idle,
    /// Loop task running
    Running,
    /// Stopped; may be started again
    Stopped,
}

#[derive(Debug)]
struct Control {
    state: SchedulerState,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// Owns the polling loop task.
pub struct Scheduler {
    source: Arc<dyn LiveDataSource>,
    driver: Arc<Mutex<TickDriver>>,
    config: SchedulerConfig,
    notifier: Notifier,
    emitter: Arc<EventEmitter>,
    ticks: Arc<AtomicU64>,
    control: Mutex<Control>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state())
            .field("ticks", &self.ticks())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Creates a scheduler in the `Idle` state.
    #[must_use]
    pub fn new(
        source: Arc<dyn LiveDataSource>,
        driver: TickDriver,
        config: SchedulerConfig,
        notifier: Notifier,
        emitter: Arc<EventEmitter>,
    ) -> Self {
        Self {
            source,
            driver: Arc::new(Mutex::new(driver)),
            config,
            notifier,
            emitter,
            ticks: Arc::new(AtomicU64::new(0)),
            control: Mutex::new(Control {
                state: SchedulerState::Idle,
                cancel: CancellationToken::new(),
                handle: None,
            }),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.control().state
    }

    /// Ticks executed so far, across restarts.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Subscribes to notifications.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    /// Subscribes to notifications as a `Stream`.
    #[must_use]
    pub fn stream(&self) -> BroadcastStream<Notification> {
        self.notifier.stream()
    }

    /// Starts the loop. Starting a running scheduler does nothing.
    ///
    /// Phase and firing records survive a stop/start cycle.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoRuntime`] outside a Tokio runtime.
    pub fn start(&self) -> Result<(), EngineError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        let mut control = self.control();
        if control.state == SchedulerState::Running {
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let tick_loop = TickLoop {
            source: Arc::clone(&self.source),
            driver: Arc::clone(&self.driver),
            config: self.config,
            ticks: Arc::clone(&self.ticks),
            cancel: cancel.clone(),
        };
        control.handle = Some(runtime.spawn(tick_loop.run()));
        control.cancel = cancel;
        control.state = SchedulerState::Running;
        drop(control);

        let pack_id = lock(&self.driver).store().snapshot().id.clone();
        info!(
            pack_id = %pack_id,
            period_ms = self.config.poll_period.as_millis(),
            "engine started"
        );
        self.emitter.emit(Event::EngineStarted {
            timestamp: Utc::now(),
            pack_id,
            poll_period_ms: u64::try_from(self.config.poll_period.as_millis()).unwrap_or(u64::MAX),
        });
        self.emitter.flush();
        Ok(())
    }

    /// Stops the loop. Idempotent.
    ///
    /// An in-flight poll is abandoned and no further tick runs. Audio
    /// dispatch already under way is not waited for.
    pub fn stop(&self) {
        let mut control = self.control();
        if control.state != SchedulerState::Running {
            return;
        }
        control.cancel.cancel();
        control.state = SchedulerState::Stopped;
        drop(control);

        info!(ticks = self.ticks(), "engine stopped");
        self.emitter.emit(Event::EngineStopped {
            timestamp: Utc::now(),
            ticks: self.ticks(),
        });
        self.emitter.flush();
    }

    /// Stops the loop and waits for its task to exit.
    pub async fn shutdown(&self) {
        self.stop();
        let handle = self.control().handle.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                debug!(error = %e, "tick loop task ended abnormally");
            }
        }
    }

    fn control(&self) -> MutexGuard<'_, Control> {
        lock(&self.control)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.control().cancel.cancel();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct TickLoop {
    source: Arc<dyn LiveDataSource>,
    driver: Arc<Mutex<TickDriver>>,
    config: SchedulerConfig,
    ticks: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl TickLoop {
    async fn run(self) {
        let mut interval = tokio::time::interval(self.config.poll_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let started = Instant::now();
            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                polled = tokio::time::timeout(self.config.poll_timeout, self.source.poll()) => {
                    polled.unwrap_or(Err(SourceError::Timeout(self.config.poll_timeout)))
                }
            };
            metrics::record_poll_duration(started.elapsed());

            // A stop issued while the poll completed wins
            if self.cancel.is_cancelled() {
                break;
            }
            self.ticks.fetch_add(1, Ordering::Relaxed);
            metrics::record_tick();
            lock(&self.driver).on_poll(result);
        }
        debug!("tick loop exited");
    }
}
