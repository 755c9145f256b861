//! Live holder of the active cue pack.
//!
//! Readers take an `Arc<CuePack>` snapshot and keep it for the whole tick.
//! Writers build a new pack and swap the `Arc`, so a tick never sees a
//! half-applied edit.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use super::model::CuePack;

/// Shared, copy-on-write handle to the active cue pack.
#[derive(Debug, Clone)]
pub struct CueStore {
    active: Arc<RwLock<Arc<CuePack>>>,
}

impl CueStore {
    /// Creates a store holding `pack`.
    #[must_use]
    pub fn new(pack: CuePack) -> Self {
        Self {
            active: Arc::new(RwLock::new(Arc::new(pack))),
        }
    }

    /// Returns a consistent snapshot of the active pack.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CuePack> {
        let guard = self.active.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replaces the active pack wholesale.
    pub fn replace(&self, pack: CuePack) {
        debug!(pack_id = %pack.id, cues = pack.cues.len(), "active cue pack replaced");
        let mut guard = self.active.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(pack);
    }

    /// Applies `edit` to a copy of the active pack and publishes the copy.
    ///
    /// Returns whatever `edit` returns.
    pub fn update<R>(&self, edit: impl FnOnce(&mut CuePack) -> R) -> R {
        let mut guard = self.active.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = CuePack::clone(&guard);
        let result = edit(&mut next);
        *guard = Arc::new(next);
        result
    }

    /// Stores a synthesised audio path on a cue.
    ///
    /// The path is only recorded if the cue still exists and its text is
    /// still `text`; an edit that happened while synthesis was running
    /// wins. Returns the updated pack when something changed.
    pub fn record_audio(&self, cue_id: &str, text: &str, path: &str) -> Option<CuePack> {
        self.update(|pack| {
            let cue = pack.cue_mut(cue_id)?;
            if cue.text != text || cue.audio_url.as_deref() == Some(path) {
                return None;
            }
            cue.audio_url = Some(path.to_string());
            Some(pack.clone())
        })
    }
}
