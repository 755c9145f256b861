//! Cue pack use cases.
//!
//! Every mutation goes load, edit, save and only then touches the live
//! [`CueStore`], so a failed save never changes what a running session
//! evaluates.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::RepositoryError;

use super::model::{Cue, CuePack, PERSONAL_PACK_ID};
use super::repository::CueRepository;
use super::rule::TriggerRule;
use super::store::CueStore;

/// Input for [`PackService::add_cue`].
#[derive(Debug, Clone)]
pub struct NewCue {
    /// Spoken text
    pub text: String,
    /// Trigger
    pub rule: TriggerRule,
}

/// Partial update for [`PackService::edit_cue`]. `None` keeps the
/// current value.
#[derive(Debug, Clone, Default)]
pub struct CueEdit {
    /// Replacement text
    pub text: Option<String>,
    /// Replacement trigger
    pub rule: Option<TriggerRule>,
}

/// Pack and cue management over a repository, keeping the live store in
/// sync with the active pack.
#[derive(Clone)]
pub struct PackService {
    repo: Arc<dyn CueRepository>,
    store: CueStore,
}

impl std::fmt::Debug for PackService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackService")
            .field("active", &self.store.snapshot().id)
            .finish_non_exhaustive()
    }
}

impl PackService {
    /// Opens the repository: makes sure the personal pack exists and
    /// loads the active pack into a fresh store.
    ///
    /// # Errors
    ///
    /// Returns a repository error if packs cannot be read or the personal
    /// pack cannot be created.
    pub fn open(repo: Arc<dyn CueRepository>) -> Result<Self, RepositoryError> {
        ensure_personal(repo.as_ref())?;
        let active = find_active(repo.as_ref())?;
        Ok(Self {
            repo,
            store: CueStore::new(active),
        })
    }

    /// The live store holding the active pack.
    #[must_use]
    pub const fn store(&self) -> &CueStore {
        &self.store
    }

    /// Re-reads the active pack from the repository and publishes it if it
    /// differs from the live one. Returns whether the live pack changed.
    ///
    /// # Errors
    ///
    /// Returns a repository error if packs cannot be read; the live store
    /// is then unchanged.
    pub fn reload(&self) -> Result<bool, RepositoryError> {
        let active = find_active(self.repo.as_ref())?;
        if *self.store.snapshot() == active {
            return Ok(false);
        }
        info!(pack_id = %active.id, cues = active.cues.len(), "active cue pack reloaded");
        self.store.replace(active);
        Ok(true)
    }

    /// Lists all packs.
    ///
    /// # Errors
    ///
    /// Returns a repository error if packs cannot be read.
    pub fn list_packs(&self) -> Result<Vec<CuePack>, RepositoryError> {
        self.repo.list()
    }

    /// Loads a single pack.
    ///
    /// # Errors
    ///
    /// Returns `PackNotFound` or a storage error.
    pub fn pack(&self, pack_id: &str) -> Result<CuePack, RepositoryError> {
        self.repo.load(pack_id)
    }

    /// Creates an empty, inactive pack. The id is derived from `name`.
    ///
    /// # Errors
    ///
    /// Returns `PackExists` if a pack with the derived id already exists.
    pub fn create_pack(&self, name: &str) -> Result<CuePack, RepositoryError> {
        let id = pack_id_for(name);
        match self.repo.load(&id) {
            Ok(_) => return Err(RepositoryError::PackExists(id)),
            Err(RepositoryError::PackNotFound(_)) => {}
            Err(e) => return Err(e),
        }
        let pack = CuePack::new(id, name.trim());
        self.repo.save(&pack)?;
        info!(pack_id = %pack.id, "cue pack created");
        Ok(pack)
    }

    /// Deletes a pack. Deleting the active pack activates the personal
    /// pack.
    ///
    /// # Errors
    ///
    /// Returns `ProtectedPack` for the personal pack, `PackNotFound` for
    /// unknown ids, or a storage error.
    pub fn delete_pack(&self, pack_id: &str) -> Result<(), RepositoryError> {
        if pack_id == PERSONAL_PACK_ID {
            return Err(RepositoryError::ProtectedPack(pack_id.to_string()));
        }
        let pack = self.repo.load(pack_id)?;
        self.repo.delete(pack_id)?;
        info!(pack_id, "cue pack deleted");
        if pack.active {
            self.activate(PERSONAL_PACK_ID)?;
        }
        Ok(())
    }

    /// Makes `pack_id` the only active pack and swaps it into the live
    /// store.
    ///
    /// # Errors
    ///
    /// Returns `PackNotFound` or a storage error. On error the live store
    /// is unchanged.
    pub fn activate(&self, pack_id: &str) -> Result<CuePack, RepositoryError> {
        let mut target = self.repo.load(pack_id)?;
        for mut other in self.repo.list()? {
            if other.id != pack_id && other.active {
                other.active = false;
                self.repo.save(&other)?;
            }
        }
        target.active = true;
        self.repo.save(&target)?;
        self.store.replace(target.clone());
        info!(pack_id, "cue pack activated");
        Ok(target)
    }

    /// Adds a cue with a fresh id to the end of a pack.
    ///
    /// # Errors
    ///
    /// Returns `PackNotFound` or a storage error.
    pub fn add_cue(&self, pack_id: &str, new: NewCue) -> Result<Cue, RepositoryError> {
        let mut pack = self.repo.load(pack_id)?;
        let mut cue = Cue::new(new.text, &new.rule);
        // Ids are unique within a pack
        while pack.cue(&cue.id).is_some() {
            cue = Cue::new(cue.text, &new.rule);
        }
        pack.push_cue(cue.clone());
        self.commit(&pack)?;
        info!(pack_id, cue_id = %cue.id, trigger = %cue.trigger_type, "cue added");
        Ok(cue)
    }

    /// Edits a cue in place, keeping its id and position. Changing the
    /// text drops the cached audio.
    ///
    /// # Errors
    ///
    /// Returns `PackNotFound`, `CueNotFound` or a storage error.
    pub fn edit_cue(
        &self,
        pack_id: &str,
        cue_id: &str,
        edit: CueEdit,
    ) -> Result<Cue, RepositoryError> {
        let mut pack = self.repo.load(pack_id)?;
        let cue = pack
            .cue_mut(cue_id)
            .ok_or_else(|| RepositoryError::CueNotFound {
                pack_id: pack_id.to_string(),
                cue_id: cue_id.to_string(),
            })?;
        if let Some(text) = edit.text {
            if text != cue.text {
                cue.text = text;
                cue.audio_url = None;
            }
        }
        if let Some(rule) = &edit.rule {
            cue.set_rule(rule);
        }
        let updated = cue.clone();
        self.commit(&pack)?;
        info!(pack_id, cue_id, "cue edited");
        Ok(updated)
    }

    /// Removes a cue.
    ///
    /// # Errors
    ///
    /// Returns `PackNotFound`, `CueNotFound` or a storage error.
    pub fn remove_cue(&self, pack_id: &str, cue_id: &str) -> Result<Cue, RepositoryError> {
        let mut pack = self.repo.load(pack_id)?;
        let removed = pack
            .remove_cue(cue_id)
            .ok_or_else(|| RepositoryError::CueNotFound {
                pack_id: pack_id.to_string(),
                cue_id: cue_id.to_string(),
            })?;
        self.commit(&pack)?;
        info!(pack_id, cue_id, "cue removed");
        Ok(removed)
    }

    /// Records a synthesised audio path on a cue of the active pack and
    /// persists it.
    ///
    /// Nothing happens if the cue was removed or its text changed since
    /// synthesis started. A failed save is logged; the path stays cached in
    /// the live store for the rest of the process.
    pub fn record_audio(&self, cue_id: &str, text: &str, path: &str) {
        let Some(pack) = self.store.record_audio(cue_id, text, path) else {
            return;
        };
        if let Err(e) = self.persist_audio(&pack, cue_id, path) {
            warn!(cue_id, error = %e, "failed to persist synthesised audio path");
        }
    }

    /// Saves only the audio field into the stored pack, so concurrent
    /// edits made through the repository are not overwritten.
    fn persist_audio(&self, live: &CuePack, cue_id: &str, path: &str) -> Result<(), RepositoryError> {
        let mut stored = match self.repo.load(&live.id) {
            Ok(stored) => stored,
            Err(RepositoryError::PackNotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        let Some(text) = live.cue(cue_id).map(|c| c.text.as_str()) else {
            return Ok(());
        };
        match stored.cue_mut(cue_id) {
            Some(cue) if cue.text == text => cue.audio_url = Some(path.to_string()),
            _ => return Ok(()),
        }
        self.repo.save(&stored)
    }

    /// Saves `pack` and, if it is the live pack, publishes it.
    fn commit(&self, pack: &CuePack) -> Result<(), RepositoryError> {
        self.repo.save(pack)?;
        if pack.active || self.store.snapshot().id == pack.id {
            self.store.replace(pack.clone());
        }
        Ok(())
    }
}

/// Creates the personal pack on first use. It starts active only when no
/// other pack is.
///
/// # Errors
///
/// Returns a repository error if packs cannot be read or saved.
pub fn ensure_personal(repo: &dyn CueRepository) -> Result<CuePack, RepositoryError> {
    match repo.load(PERSONAL_PACK_ID) {
        Ok(pack) => Ok(pack),
        Err(RepositoryError::PackNotFound(_)) => {
            let mut pack = CuePack::personal();
            pack.active = !repo.list()?.iter().any(|p| p.active);
            repo.save(&pack)?;
            info!(active = pack.active, "personal cue pack created");
            Ok(pack)
        }
        Err(e) => Err(e),
    }
}

/// The first active pack by id, falling back to the personal pack.
fn find_active(repo: &dyn CueRepository) -> Result<CuePack, RepositoryError> {
    let packs = repo.list()?;
    let active: Vec<_> = packs.iter().filter(|p| p.active).collect();
    if active.len() > 1 {
        warn!(
            count = active.len(),
            using = %active[0].id,
            "more than one cue pack is marked active"
        );
    }
    match active.first() {
        Some(pack) => Ok((*pack).clone()),
        None => repo.load(PERSONAL_PACK_ID),
    }
}

/// Lowercase, dash-separated id derived from a display name.
fn pack_id_for(name: &str) -> String {
    let mut id = String::new();
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            id.push(c.to_ascii_lowercase());
        } else if !id.is_empty() && !id.ends_with('-') {
            id.push('-');
        }
    }
    let id = id.trim_end_matches('-').to_string();
    if id.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        id
    }
}
