//! Error types for `CueCaller`
//!
//! One enum per concern, aggregated by [`CueCallerError`] which maps every
//! failure onto a process exit code. Only configuration, repository and I/O
//! failures ever reach the CLI; poll failures are absorbed by the phase
//! tracker and per-cue failures by the dispatcher.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `CueCaller` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Live data source could not be set up
    pub const SOURCE_ERROR: i32 = 4;

    /// Cue pack repository failure
    pub const REPOSITORY_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `CueCaller` operations.
#[derive(Debug, Error)]
pub enum CueCallerError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Data source setup error
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Cue pack repository error
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Scheduler lifecycle error
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Invalid command-line usage
    #[error("usage error: {0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CueCallerError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) => ExitCode::CONFIG_ERROR,
            Self::Source(_) => ExitCode::SOURCE_ERROR,
            Self::Repository(_) => ExitCode::REPOSITORY_ERROR,
            Self::Engine(_) => ExitCode::ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}: {}", summarize(errors))]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration or pack validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "cues[2].interval")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - validation failure that prevents the file from being used
    Error,
    /// Warning - potential issue that does not prevent loading
    Warning,
}

// ============================================================================
// Data Source Errors
// ============================================================================

/// Failures reported by a live data source poll.
///
/// `NotInGame`, `Transport`, `Timeout` and `InvalidPayload` are transient
/// and only end a session after the configured number of consecutive
/// failures. `GameEnded` is authoritative and ends the session at once.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The game client is not in a game (or still loading)
    #[error("not in a game")]
    NotInGame,

    /// The data source reported that the game is over
    #[error("game ended")]
    GameEnded,

    /// Connection or protocol failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// Poll did not complete within the configured timeout
    #[error("poll timed out after {0:?}")]
    Timeout(Duration),

    /// The data source answered with something that is not a game snapshot
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl SourceError {
    /// Returns `true` for the authoritative end-of-game signal.
    #[must_use]
    pub const fn is_session_end(&self) -> bool {
        matches!(self, Self::GameEnded)
    }

    /// Short label used for metrics and structured events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotInGame => "not_in_game",
            Self::GameEnded => "game_ended",
            Self::Transport(_) => "transport",
            Self::Timeout(_) => "timeout",
            Self::InvalidPayload(_) => "invalid_payload",
        }
    }
}

// ============================================================================
// Synthesis / Playback Errors
// ============================================================================

/// Text-to-speech synthesis failures. A failed synthesis drops the firing.
#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    /// The synthesizer command is empty or could not be spawned
    #[error("failed to spawn synthesizer: {0}")]
    SpawnFailed(String),

    /// Synthesis exceeded its timeout
    #[error("synthesis timed out after {0:?}")]
    Timeout(Duration),

    /// The synthesizer exited with a non-zero status
    #[error("synthesizer exited with code {code:?}: {stderr}")]
    NonZeroExit {
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Captured stderr
        stderr: String,
    },

    /// The synthesizer reported success but produced no file
    #[error("synthesizer produced no output at {0}")]
    MissingOutput(PathBuf),

    /// Output directory could not be prepared
    #[error("synthesis I/O error: {0}")]
    Io(String),
}

/// Audio playback failures. Logged and counted; never retried.
#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    /// The player command is empty or could not be spawned
    #[error("failed to spawn player: {0}")]
    SpawnFailed(String),

    /// The player exited with a non-zero status
    #[error("player exited with code {0:?}")]
    NonZeroExit(Option<i32>),
}

// ============================================================================
// Cue Configuration Errors
// ============================================================================

/// A cue whose trigger parameters cannot be evaluated.
///
/// Such a cue never fires; it is reported once as a diagnostic until it
/// is edited.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CueConfigError {
    /// A parameter required by the trigger type is absent
    #[error("{trigger} cue is missing '{field}'")]
    MissingParameter {
        /// Trigger type name
        trigger: &'static str,
        /// Missing field name
        field: &'static str,
    },

    /// A parameter is present but unusable
    #[error("{trigger} cue has invalid '{field}': {reason}")]
    InvalidParameter {
        /// Trigger type name
        trigger: &'static str,
        /// Offending field name
        field: &'static str,
        /// Why the value is rejected
        reason: String,
    },
}

// ============================================================================
// Repository Errors
// ============================================================================

/// Cue pack repository and pack use-case failures.
///
/// These surface to the caller of add/edit/remove and never affect a
/// running polling session.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No pack with the given id
    #[error("cue pack not found: {0}")]
    PackNotFound(String),

    /// No cue with the given id in the pack
    #[error("cue '{cue_id}' not found in pack '{pack_id}'")]
    CueNotFound {
        /// Pack that was searched
        pack_id: String,
        /// Missing cue id
        cue_id: String,
    },

    /// A pack with this id already exists
    #[error("cue pack already exists: {0}")]
    PackExists(String),

    /// The personal pack cannot be deleted
    #[error("cue pack '{0}' is protected and cannot be deleted")]
    ProtectedPack(String),

    /// Stored pack could not be decoded
    #[error("failed to parse cue pack {path}: {message}")]
    Parse {
        /// File that failed to parse
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Underlying storage failure
    #[error("cue pack storage error at {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Engine Errors
// ============================================================================

/// Scheduler lifecycle errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `start()` requires a Tokio runtime
    #[error("scheduler must be started from within a Tokio runtime")]
    NoRuntime,
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `CueCaller` operations.
pub type Result<T> = std::result::Result<T, CueCallerError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::SUCCESS, 0);
        assert_eq!(ExitCode::ERROR, 1);
        assert_eq!(ExitCode::CONFIG_ERROR, 2);
        assert_eq!(ExitCode::IO_ERROR, 3);
        assert_eq!(ExitCode::SOURCE_ERROR, 4);
        assert_eq!(ExitCode::REPOSITORY_ERROR, 5);
        assert_eq!(ExitCode::USAGE_ERROR, 64);
        assert_eq!(ExitCode::INTERRUPTED, 130);
        assert_eq!(ExitCode::TERMINATED, 143);
    }

    #[test]
    fn test_repository_error_exit_code() {
        let err: CueCallerError = RepositoryError::PackNotFound("raid".to_string()).into();
        assert_eq!(err.exit_code(), ExitCode::REPOSITORY_ERROR);
    }

    #[test]
    fn test_config_error_exit_code() {
        let err: CueCallerError = ConfigError::MissingFile {
            path: PathBuf::from("/test"),
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn test_io_error_exit_code() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: CueCallerError = io_err.into();
        assert_eq!(err.exit_code(), ExitCode::IO_ERROR);
    }

    #[test]
    fn test_source_error_kinds() {
        assert_eq!(SourceError::NotInGame.kind(), "not_in_game");
        assert_eq!(
            SourceError::Timeout(Duration::from_secs(2)).kind(),
            "timeout"
        );
        assert!(SourceError::GameEnded.is_session_end());
        assert!(!SourceError::Transport("refused".to_string()).is_session_end());
    }

    #[test]
    fn test_validation_issue_display() {
        let issue = ValidationIssue {
            path: "cues[0].interval".to_string(),
            message: "interval must be positive".to_string(),
            severity: Severity::Error,
        };
        assert_eq!(
            issue.to_string(),
            "error: interval must be positive at cues[0].interval"
        );
    }

    #[test]
    fn test_validation_error_lists_issues() {
        let err = ConfigError::ValidationError {
            path: "cuecaller.yaml".to_string(),
            errors: vec![ValidationIssue {
                path: "poll_period".to_string(),
                message: "must be greater than zero".to_string(),
                severity: Severity::Error,
            }],
        };
        let text = err.to_string();
        assert!(text.contains("cuecaller.yaml"));
        assert!(text.contains("poll_period"));
    }

    #[test]
    fn test_cue_config_error_display() {
        let err = CueConfigError::MissingParameter {
            trigger: "objective",
            field: "beforeObjective",
        };
        assert_eq!(err.to_string(), "objective cue is missing 'beforeObjective'");
    }
}
