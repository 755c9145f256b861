//! Audio playback.
//!
//! Clips are played one at a time by a single background worker fed
//! through a channel, so two cues firing together never talk over each
//! other and play in dispatch order.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{EngineError, PlaybackError};
use crate::observability::metrics;

use super::render_command;

/// Capacity of the playback queue.
const QUEUE_CAPACITY: usize = 64;

/// Plays an audio file to completion.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Plays `path`, returning when playback has finished.
    async fn play(&self, path: &Path) -> Result<(), PlaybackError>;
}

/// Runs an argv template with a `{path}` placeholder.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    command: Vec<String>,
}

impl CommandPlayer {
    /// Creates a player from an argv template.
    #[must_use]
    pub const fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl AudioPlayer for CommandPlayer {
    async fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        let path_str = path.to_string_lossy();
        let argv = render_command(&self.command, &[("{path}", &path_str)]);
        let Some((program, args)) = argv.split_first() else {
            return Err(PlaybackError::SpawnFailed("empty command".to_string()));
        };
        let status = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| PlaybackError::SpawnFailed(format!("{program}: {e}")))?;
        if status.success() {
            Ok(())
        } else {
            Err(PlaybackError::NonZeroExit(status.code()))
        }
    }
}

/// Player that only logs what it would play.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPlayer;

#[async_trait]
impl AudioPlayer for LogPlayer {
    async fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        info!(path = %path.display(), "playing cue audio");
        Ok(())
    }
}

/// Sending half of the playback worker.
#[derive(Debug, Clone)]
pub struct PlaybackQueue {
    tx: mpsc::Sender<PathBuf>,
}

impl PlaybackQueue {
    /// Starts the worker. It stops when `cancel` fires or every queue
    /// handle has been dropped.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoRuntime`] outside a Tokio runtime.
    pub fn spawn(
        player: Arc<dyn AudioPlayer>,
        cancel: CancellationToken,
    ) -> Result<(Self, JoinHandle<()>), EngineError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let handle = runtime.spawn(run_worker(player, rx, cancel));
        Ok((Self { tx }, handle))
    }

    /// Queues a clip. Waits while the queue is full; returns `false` if
    /// the worker is gone.
    pub async fn enqueue(&self, path: PathBuf) -> bool {
        self.tx.send(path).await.is_ok()
    }
}

async fn run_worker(
    player: Arc<dyn AudioPlayer>,
    mut rx: mpsc::Receiver<PathBuf>,
    cancel: CancellationToken,
) {
    loop {
        let path = tokio::select! {
            () = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(path) => path,
                None => break,
            },
        };
        debug!(path = %path.display(), "playback started");
        if let Err(e) = player.play(&path).await {
            metrics::record_playback_failure();
            warn!(path = %path.display(), error = %e, "playback failed");
        }
    }
    debug!("playback worker stopped");
}
