//! Scripted data source.
//!
//! Replays a JSON-lines script, one poll result per line:
//!
//! ```text
//! {"snapshot": {"game_time": 1.0, "started": true}}
//! {"error": "transport"}
//! ```
//!
//! Once the script is exhausted every poll answers `NotInGame`.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{ConfigError, SourceError};

use super::{GameSnapshot, LiveDataSource, PollResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
enum ScriptLine {
    Snapshot(GameSnapshot),
    Error(ScriptedError),
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ScriptedError {
    NotInGame,
    GameEnded,
    Transport,
    Timeout,
    InvalidPayload,
}

impl From<ScriptedError> for SourceError {
    fn from(value: ScriptedError) -> Self {
        match value {
            ScriptedError::NotInGame => Self::NotInGame,
            ScriptedError::GameEnded => Self::GameEnded,
            ScriptedError::Transport => Self::Transport("scripted transport failure".to_string()),
            ScriptedError::Timeout => Self::Timeout(Duration::ZERO),
            ScriptedError::InvalidPayload => {
                Self::InvalidPayload("scripted invalid payload".to_string())
            }
        }
    }
}

/// Data source that plays back a fixed sequence of poll results.
#[derive(Debug)]
pub struct ReplaySource {
    remaining: Mutex<VecDeque<PollResult>>,
}

impl ReplaySource {
    /// Creates a source from an explicit list of results.
    #[must_use]
    pub fn new(results: impl IntoIterator<Item = PollResult>) -> Self {
        Self {
            remaining: Mutex::new(results.into_iter().collect()),
        }
    }

    /// Parses a replay script. Blank lines and lines starting with `#` are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` naming the first bad line.
    pub fn parse(script: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut results = VecDeque::new();
        for (idx, line) in script.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parsed: ScriptLine =
                serde_json::from_str(line).map_err(|e| ConfigError::ParseError {
                    path: path.to_path_buf(),
                    line: Some(idx + 1),
                    message: e.to_string(),
                })?;
            results.push_back(match parsed {
                ScriptLine::Snapshot(snapshot) => Ok(snapshot),
                ScriptLine::Error(err) => Err(err.into()),
            });
        }
        Ok(Self {
            remaining: Mutex::new(results),
        })
    }

    /// Reads and parses a replay script file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingFile` if the file cannot be read, or a
    /// parse error.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let script = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        Self::parse(&script, path)
    }

    /// Number of scripted results not yet returned.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl LiveDataSource for ReplaySource {
    async fn poll(&self) -> PollResult {
        self.remaining
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(Err(SourceError::NotInGame))
    }
}
