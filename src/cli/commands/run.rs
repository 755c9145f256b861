//! `run`: wire the engine together and drive it until interrupted.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::args::RunArgs;
use crate::config::EngineConfig;
use crate::cue::{PackService, PackWatcher};
use crate::cue::validation::PackValidator;
use crate::dispatch::{
    AudioPlayer, CommandPlayer, CommandSynthesizer, Dispatcher, LogPlayer, PlaybackQueue,
};
use crate::engine::{Notification, Notifier, Scheduler, SchedulerConfig, TickDriver};
use crate::error::CueCallerError;
use crate::observability::{EventEmitter, init_metrics};
use crate::phase::PhaseTracker;
use crate::source::{LiveClientSource, LiveDataSource, ObjectiveClock, ReplaySource};

/// Upper bound on waiting for queued clips after the loop stops.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the engine until `cancel` fires, or until a replay script is
/// exhausted.
///
/// # Errors
///
/// Returns an error if the config, pack repository, replay script, events
/// file or metrics listener cannot be set up.
pub async fn run(args: &RunArgs, cancel: CancellationToken) -> Result<(), CueCallerError> {
    if let Some(port) = args.metrics_port {
        init_metrics(Some(port))?;
        info!(port, "Prometheus metrics endpoint started");
    }

    let (config, service) = super::open_service(&args.store)?;
    if let Some(pack_id) = &args.pack {
        service.activate(pack_id)?;
    }
    report_pack_issues(&service, &config);

    let replay = match &args.replay {
        Some(path) => {
            info!(replay = %path.display(), "replaying recorded polls");
            Some(Arc::new(ReplaySource::from_file(path)?))
        }
        None => None,
    };
    let source: Arc<dyn LiveDataSource> = match &replay {
        Some(replay) => Arc::clone(replay) as Arc<dyn LiveDataSource>,
        None => Arc::new(LiveClientSource::new(
            config.data_source.url.clone(),
            config.data_source.accept_invalid_certs,
            config.poll_timeout,
            ObjectiveClock::new(config.objectives.clone()),
        )?),
    };

    let emitter = Arc::new(match &args.events_file {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::stderr(),
    });
    let notifier = Notifier::default();

    let player: Arc<dyn AudioPlayer> = match &config.playback.command {
        Some(command) => Arc::new(CommandPlayer::new(command.clone())),
        None => Arc::new(LogPlayer),
    };
    let playback_cancel = CancellationToken::new();
    let (queue, playback_worker) = PlaybackQueue::spawn(player, playback_cancel.clone())?;

    let synthesizer = CommandSynthesizer::new(
        config.synthesis.command.clone(),
        config.synthesis.output_dir.clone(),
        config.synthesis.timeout,
    );
    let dispatcher = Dispatcher::new(
        Arc::new(synthesizer),
        queue,
        Arc::new(service.clone()),
        notifier.clone(),
        Arc::clone(&emitter),
    );
    let driver = TickDriver::new(
        PhaseTracker::new(config.failure_threshold),
        service.store().clone(),
        dispatcher.clone(),
        notifier.clone(),
        Arc::clone(&emitter),
    );
    let scheduler = Scheduler::new(
        source,
        driver,
        SchedulerConfig {
            poll_period: config.poll_period,
            poll_timeout: config.poll_timeout,
        },
        notifier,
        emitter,
    );

    // Edits made by `cue`/`pack` commands while the engine runs
    let packs_dir = super::packs_dir(&args.store, &config);
    let watch_cancel = CancellationToken::new();
    let watcher = match PackWatcher::new(&packs_dir) {
        Ok(watcher) => Some(watcher.spawn(service.clone(), watch_cancel.clone())),
        Err(e) => {
            warn!(
                error = %e,
                packs_dir = %packs_dir.display(),
                "cannot watch cue packs; edits apply on restart"
            );
            None
        }
    };

    let printer_done = CancellationToken::new();
    let printer = tokio::spawn(print_fired_cues(scheduler.stream(), printer_done.clone()));

    scheduler.start()?;

    match &replay {
        Some(replay) => wait_for_replay(replay, config.poll_period, &cancel).await,
        None => cancel.cancelled().await,
    }

    watch_cancel.cancel();
    if let Some(watcher) = watcher {
        let _ = watcher.await;
    }
    scheduler.shutdown().await;
    dispatcher.wait_idle().await;
    drop(scheduler);
    drop(dispatcher);

    // Every queue handle is gone: the worker drains what is left and exits
    if tokio::time::timeout(DRAIN_TIMEOUT, playback_worker).await.is_err() {
        warn!("playback did not drain in time; remaining clips dropped");
        playback_cancel.cancel();
    }

    printer_done.cancel();
    let _ = printer.await;
    Ok(())
}

/// Logs offline validation issues of the active pack. Live evaluation
/// still runs every usable cue.
fn report_pack_issues(service: &PackService, config: &EngineConfig) {
    let pack = service.store().snapshot();
    info!(pack_id = %pack.id, cues = pack.cues.len(), "active cue pack");
    let report = PackValidator::new().validate(&pack, &config.objective_names());
    for issue in report.errors.iter().chain(&report.warnings) {
        warn!(pack_id = %pack.id, "{issue}");
    }
}

/// Returns once every scripted poll has been consumed and one more period
/// has passed for the last tick to finish, or when `cancel` fires.
async fn wait_for_replay(replay: &ReplaySource, period: Duration, cancel: &CancellationToken) {
    let mut check = tokio::time::interval(period);
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            _ = check.tick() => {}
        }
        if replay.remaining() == 0 {
            break;
        }
    }
    tokio::select! {
        () = cancel.cancelled() => {}
        () = tokio::time::sleep(period) => {}
    }
    info!("replay finished");
}

/// Writes each fired cue to stdout as one JSON line.
async fn print_fired_cues(
    mut feed: tokio_stream::wrappers::BroadcastStream<Notification>,
    done: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            next = feed.next() => next,
            () = done.cancelled() => break,
        };
        match next {
            Some(Ok(notification @ Notification::CueFired { .. })) => {
                if let Ok(line) = serde_json::to_string(&notification) {
                    let mut out = std::io::stdout().lock();
                    let _ = writeln!(out, "{line}");
                    let _ = out.flush();
                }
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => warn!(error = %e, "cue feed lagged"),
            None => break,
        }
    }
}
