//! Engine configuration validation.
//!
//! Validation collects every issue instead of stopping at the first.

use std::collections::HashSet;

use crate::config::schema::EngineConfig;
use crate::error::{Severity, ValidationIssue};

// ============================================================================
// Public API
// ============================================================================

/// Result of validating a configuration or cue pack.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Poll timeouts beyond this many poll periods draw a warning.
const MAX_TIMEOUT_PERIODS: u32 = 10;

/// Engine configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns every issue found.
    pub fn validate(&mut self, config: &EngineConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_timing(config);
        self.validate_commands(config);
        self.validate_objectives(config);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Rules
    // ========================================================================

    fn validate_timing(&mut self, config: &EngineConfig) {
        if config.poll_period.is_zero() {
            self.add_error("poll_period", "Poll period must be greater than zero");
        }
        if config.poll_timeout.is_zero() {
            self.add_error("poll_timeout", "Poll timeout must be greater than zero");
        }
        if config.failure_threshold == 0 {
            self.add_error(
                "failure_threshold",
                "Failure threshold must be at least 1",
            );
        }
        if !config.poll_period.is_zero()
            && config.poll_timeout > config.poll_period * MAX_TIMEOUT_PERIODS
        {
            self.add_warning(
                "poll_timeout",
                &format!(
                    "Poll timeout is more than {MAX_TIMEOUT_PERIODS} poll periods; a hung \
                     data source will stall cue evaluation"
                ),
            );
        }
        if config.synthesis.timeout.is_zero() {
            self.add_error("synthesis.timeout", "Synthesis timeout must be greater than zero");
        }
    }

    fn validate_commands(&mut self, config: &EngineConfig) {
        let synth = &config.synthesis.command;
        if synth.is_empty() || synth[0].trim().is_empty() {
            self.add_error("synthesis.command", "Synthesis command cannot be empty");
        } else if !synth.iter().any(|a| a.contains("{output}")) {
            self.add_error(
                "synthesis.command",
                "Synthesis command must contain an {output} placeholder",
            );
        } else if !synth.iter().any(|a| a.contains("{text}")) {
            self.add_warning(
                "synthesis.command",
                "Synthesis command has no {text} placeholder; every cue will sound the same",
            );
        }

        if let Some(play) = &config.playback.command {
            if play.is_empty() || play[0].trim().is_empty() {
                self.add_error("playback.command", "Playback command cannot be empty");
            } else if !play.iter().any(|a| a.contains("{path}")) {
                self.add_error(
                    "playback.command",
                    "Playback command must contain a {path} placeholder",
                );
            }
        }
    }

    fn validate_objectives(&mut self, config: &EngineConfig) {
        let mut seen = HashSet::new();
        for (i, objective) in config.objectives.iter().enumerate() {
            let path = format!("objectives[{i}]");
            let name = objective.name.trim();
            if name.is_empty() {
                self.add_error(&format!("{path}.name"), "Objective name cannot be empty");
            } else if !seen.insert(name.to_ascii_lowercase()) {
                self.add_error(
                    &format!("{path}.name"),
                    &format!("Duplicate objective name '{name}'"),
                );
            }
            if objective.kill_event.trim().is_empty() {
                self.add_error(
                    &format!("{path}.kill_event"),
                    "Objective kill event cannot be empty",
                );
            }
            if objective.respawn == 0 {
                self.add_error(
                    &format!("{path}.respawn"),
                    "Objective respawn must be greater than zero",
                );
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::source::objectives::ObjectiveSpec;

    fn objective(name: &str, respawn: u64) -> ObjectiveSpec {
        ObjectiveSpec {
            name: name.to_string(),
            kill_event: "DragonKill".to_string(),
            first_spawn: 300,
            respawn,
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let result = Validator::new().validate(&EngineConfig::default());
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_collects_all_errors() {
        let config = EngineConfig {
            poll_period: Duration::ZERO,
            failure_threshold: 0,
            objectives: vec![objective("dragon", 300), objective("Dragon", 0)],
            ..EngineConfig::default()
        };
        let result = Validator::new().validate(&config);
        let paths: Vec<&str> = result.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, [
            "poll_period",
            "failure_threshold",
            "objectives[1].name",
            "objectives[1].respawn"
        ]);
    }

    #[test]
    fn test_long_timeout_is_a_warning() {
        let config = EngineConfig {
            poll_timeout: Duration::from_secs(11),
            ..EngineConfig::default()
        };
        let result = Validator::new().validate(&config);
        assert!(result.is_valid());
        assert_eq!(result.warnings[0].path, "poll_timeout");
    }

    #[test]
    fn test_command_placeholders() {
        let mut config = EngineConfig::default();
        config.synthesis.command = vec!["say".to_string(), "{text}".to_string()];
        config.playback.command = Some(vec!["aplay".to_string()]);
        let result = Validator::new().validate(&config);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].message.contains("{output}"));
        assert!(result.errors[1].message.contains("{path}"));

        config.synthesis.command = Vec::new();
        let result = Validator::new().validate(&config);
        assert!(result.errors[0].message.contains("cannot be empty"));
    }
}
