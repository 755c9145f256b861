//! Cue pack persistence.
//!
//! The engine only needs `load`/`save`; `list` and `delete` back the pack
//! management commands. [`YamlRepository`] stores one `<id>.yaml` file per
//! pack; [`MemoryRepository`] keeps packs in memory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::RepositoryError;

use super::model::CuePack;

/// Storage for cue packs.
pub trait CueRepository: Send + Sync {
    /// Loads the pack with the given id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::PackNotFound` if no such pack is stored,
    /// or a storage/parse error.
    fn load(&self, pack_id: &str) -> Result<CuePack, RepositoryError>;

    /// Stores `pack`, replacing any previous version with the same id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the pack cannot be written.
    fn save(&self, pack: &CuePack) -> Result<(), RepositoryError>;

    /// Lists all stored packs, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns a storage/parse error if any pack cannot be read.
    fn list(&self) -> Result<Vec<CuePack>, RepositoryError>;

    /// Deletes the pack with the given id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::PackNotFound` if no such pack is stored.
    fn delete(&self, pack_id: &str) -> Result<(), RepositoryError>;
}

// ============================================================================
// YAML files
// ============================================================================

/// One YAML file per pack in a directory.
#[derive(Debug, Clone)]
pub struct YamlRepository {
    dir: PathBuf,
}

impl YamlRepository {
    /// Creates a repository rooted at `dir`. The directory is created on
    /// first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the pack files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, pack_id: &str) -> PathBuf {
        self.dir.join(format!("{}.yaml", sanitize_id(pack_id)))
    }

    fn read(path: &Path) -> Result<CuePack, RepositoryError> {
        let raw = std::fs::read_to_string(path).map_err(|source| RepositoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|e| RepositoryError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

impl CueRepository for YamlRepository {
    fn load(&self, pack_id: &str) -> Result<CuePack, RepositoryError> {
        let path = self.path_for(pack_id);
        if !path.exists() {
            return Err(RepositoryError::PackNotFound(pack_id.to_string()));
        }
        Self::read(&path)
    }

    fn save(&self, pack: &CuePack) -> Result<(), RepositoryError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| RepositoryError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path_for(&pack.id);
        let yaml = serde_yaml::to_string(pack).map_err(|e| RepositoryError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;

        // Readers only ever see a complete file
        let tmp = path.with_extension("yaml.tmp");
        std::fs::write(&tmp, yaml).map_err(|source| RepositoryError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| RepositoryError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(pack_id = %pack.id, path = %path.display(), "cue pack saved");
        Ok(())
    }

    fn list(&self) -> Result<Vec<CuePack>, RepositoryError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(RepositoryError::Io {
                    path: self.dir.clone(),
                    source,
                });
            }
        };

        let mut packs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| RepositoryError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("yaml") {
                packs.push(Self::read(&path)?);
            }
        }
        packs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(packs)
    }

    fn delete(&self, pack_id: &str) -> Result<(), RepositoryError> {
        let path = self.path_for(pack_id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RepositoryError::PackNotFound(pack_id.to_string()))
            }
            Err(source) => Err(RepositoryError::Io { path, source }),
        }
    }
}

/// Keeps pack ids from escaping the repository directory.
fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// ============================================================================
// In-memory
// ============================================================================

/// In-memory repository.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    packs: Mutex<BTreeMap<String, CuePack>>,
}

impl MemoryRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CueRepository for MemoryRepository {
    fn load(&self, pack_id: &str) -> Result<CuePack, RepositoryError> {
        self.packs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pack_id)
            .cloned()
            .ok_or_else(|| RepositoryError::PackNotFound(pack_id.to_string()))
    }

    fn save(&self, pack: &CuePack) -> Result<(), RepositoryError> {
        self.packs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pack.id.clone(), pack.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<CuePack>, RepositoryError> {
        Ok(self
            .packs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect())
    }

    fn delete(&self, pack_id: &str) -> Result<(), RepositoryError> {
        self.packs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(pack_id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::PackNotFound(pack_id.to_string()))
    }
}
