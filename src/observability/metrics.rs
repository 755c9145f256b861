//! Prometheus metrics.
//!
//! Recording functions are no-ops until [`init_metrics`] installs a
//! recorder, so the engine can call them unconditionally. Label values
//! come from closed sets (trigger kinds, error kinds, transitions), never
//! from user-authored cue text or ids.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::CueCallerError;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Installs the global metrics recorder.
///
/// With a port, a Prometheus listener is started on `127.0.0.1:<port>`;
/// without one the recorder only collects in-process. Calling this twice
/// is a no-op.
///
/// # Errors
///
/// Returns `CueCallerError::Io` if the recorder or listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), CueCallerError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| CueCallerError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!("cuecaller_ticks_total", "Polling loop ticks executed");
    describe_counter!(
        "cuecaller_poll_failures_total",
        "Failed or absent polls by kind"
    );
    describe_histogram!(
        "cuecaller_poll_duration_ms",
        "Live data source poll duration in milliseconds"
    );
    describe_counter!(
        "cuecaller_session_transitions_total",
        "Game session starts and ends"
    );
    describe_counter!("cuecaller_cues_fired_total", "Cue firings by trigger kind");
    describe_counter!(
        "cuecaller_synthesis_total",
        "Speech synthesis attempts by outcome"
    );
    describe_counter!(
        "cuecaller_playback_failures_total",
        "Audio clips that failed to play"
    );
    describe_gauge!(
        "cuecaller_game_time_seconds",
        "Session clock of the current game"
    );
}

/// Records one polling loop tick.
pub fn record_tick() {
    counter!("cuecaller_ticks_total").increment(1);
}

/// Records a failed poll; `kind` is a [`SourceError::kind`] label.
///
/// [`SourceError::kind`]: crate::error::SourceError::kind
pub fn record_poll_failure(kind: &'static str) {
    counter!("cuecaller_poll_failures_total", "kind" => kind).increment(1);
}

/// Records how long a poll took.
pub fn record_poll_duration(duration: Duration) {
    histogram!("cuecaller_poll_duration_ms").record(duration.as_secs_f64() * 1000.0);
}

/// Records a session transition; `transition` is a
/// [`Transition::label`](crate::phase::Transition::label).
pub fn record_session_transition(transition: &'static str) {
    counter!("cuecaller_session_transitions_total", "transition" => transition).increment(1);
}

/// Records a cue firing by trigger kind.
pub fn record_cue_fired(trigger: &'static str) {
    counter!("cuecaller_cues_fired_total", "trigger" => trigger).increment(1);
}

/// Records a synthesis outcome (`"ok"`, `"error"` or `"cached"`).
pub fn record_synthesis(outcome: &'static str) {
    counter!("cuecaller_synthesis_total", "outcome" => outcome).increment(1);
}

/// Records a failed playback.
pub fn record_playback_failure() {
    counter!("cuecaller_playback_failures_total").increment(1);
}

/// Sets the session clock gauge.
pub fn set_game_time(seconds: f64) {
    gauge!("cuecaller_game_time_seconds").set(seconds);
}
