//! Reloads the active cue pack when pack files change on disk.
//!
//! `cue` and `pack` commands run as separate processes and only touch the
//! packs directory. A running engine picks their edits up here and swaps
//! the new pack into its [`CueStore`](super::CueStore).

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, Receiver};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::service::PackService;

/// Quiet period after a change before packs are re-read. Saves land as a
/// burst of create/rename events.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Watches a packs directory for changes to `*.yaml` pack files.
pub struct PackWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
}

impl std::fmt::Debug for PackWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackWatcher").finish_non_exhaustive()
    }
}

impl PackWatcher {
    /// Starts watching `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform watcher cannot be created or the
    /// directory cannot be watched.
    pub fn new(dir: &Path) -> notify::Result<Self> {
        let (tx, rx) = mpsc::channel(100);

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.blocking_send(res);
            },
            Config::default(),
        )?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Waits for the next change to a pack file. `None` once the watcher
    /// has shut down.
    pub async fn changed(&mut self) -> Option<PathBuf> {
        while let Some(result) = self.rx.recv().await {
            match result {
                Ok(event) => {
                    if let Some(path) = pack_change(&event) {
                        return Some(path);
                    }
                }
                Err(e) => warn!(error = %e, "pack directory watcher error"),
            }
        }
        None
    }

    fn drain(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }

    /// Runs the reload loop until `cancel` fires. Each burst of changes
    /// triggers one [`PackService::reload`]; a failed reload keeps the
    /// current live pack.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(mut self, service: PackService, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let path = tokio::select! {
                    () = cancel.cancelled() => break,
                    changed = self.changed() => match changed {
                        Some(path) => path,
                        None => break,
                    },
                };
                debug!(path = %path.display(), "pack file changed");

                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(SETTLE_DELAY) => {}
                }
                self.drain();

                let reloading = service.clone();
                match tokio::task::spawn_blocking(move || reloading.reload()).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => {
                        warn!(error = %e, "cannot reload cue packs; keeping the current pack");
                    }
                    Err(e) => warn!(error = %e, "cue pack reload task failed"),
                }
            }
            debug!("pack watcher stopped");
        })
    }
}

/// The pack file an event touched, if any. Temp files written during a
/// save end in `.tmp` and are skipped.
fn pack_change(event: &Event) -> Option<PathBuf> {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return None;
    }
    event.paths.iter().find(|p| is_pack_file(p)).cloned()
}

fn is_pack_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("yaml")
}
