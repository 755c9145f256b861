//! Configuration loader.
//!
//! Pipeline:
//! 1. Size limit check
//! 2. UTF-8 BOM strip
//! 3. YAML parsing into the typed config
//! 4. Environment variable overrides
//! 5. Validation (errors abort, warnings are returned)
//! 6. Freeze with `Arc`

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::schema::EngineConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "cuecaller.yaml";

// ============================================================================
// Public API
// ============================================================================

/// Options for the configuration loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Limits for configuration size.
    pub config_limits: ConfigLimits,

    /// Apply `CUECALLER_*` environment overrides after parsing.
    pub env_overrides: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            config_limits: ConfigLimits::default(),
            env_overrides: true,
        }
    }
}

/// Limits for configuration size to prevent resource exhaustion.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_config_size: env_or("CUECALLER_MAX_CONFIG_SIZE", 1024 * 1024),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: Arc<EngineConfig>,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a new configuration loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a new configuration loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Loads `path` if given, otherwise [`DEFAULT_CONFIG_PATH`] if it
    /// exists, otherwise the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file is missing, or if the
    /// file that is read fails to parse or validate.
    pub fn load_or_default(&self, path: Option<&Path>) -> Result<LoadResult, ConfigError> {
        match path {
            Some(path) => self.load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    self.load(default)
                } else {
                    self.finish(EngineConfig::default(), default)
                }
            }
        }
    }

    /// Loads a configuration file and returns the frozen configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or exceeds the size limit
    /// - YAML parsing or deserialization fails
    /// - An environment override has an invalid value
    /// - Validation fails
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let max = self.options.config_limits.max_config_size;
        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > max {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{file_size} bytes"),
                expected: format!("at most {max} bytes"),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        self.load_str(&raw, path)
    }

    /// Loads configuration from YAML text; `path` is only used in errors.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigLoader::load`], minus file access.
    pub fn load_str(&self, content: &str, path: &Path) -> Result<LoadResult, ConfigError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        // An empty or comment-only file means "all defaults"
        let config: EngineConfig = if content.trim().is_empty() {
            EngineConfig::default()
        } else {
            let value: serde_yaml::Value =
                serde_yaml::from_str(content).map_err(|e| parse_error(path, &e))?;
            if value.is_null() {
                EngineConfig::default()
            } else {
                serde_yaml::from_value(value).map_err(|e| ConfigError::ParseError {
                    path: path.to_path_buf(),
                    line: None,
                    message: format!("Failed to deserialize configuration: {e}"),
                })?
            }
        };

        self.finish(config, path)
    }

    fn finish(&self, mut config: EngineConfig, path: &Path) -> Result<LoadResult, ConfigError> {
        if self.options.env_overrides {
            apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
        }

        let result = Validator::new().validate(&config);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: result.errors,
            });
        }

        let warnings = result
            .warnings
            .into_iter()
            .map(|issue| LoadWarning {
                message: issue.message,
                location: Some(issue.path),
            })
            .collect();

        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }
}

// ============================================================================
// Environment Overrides
// ============================================================================

/// Applies `CUECALLER_*` overrides read through `lookup`.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if a set variable cannot be parsed.
pub fn apply_env_overrides(
    config: &mut EngineConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(v) = lookup("CUECALLER_POLL_PERIOD") {
        config.poll_period = parse_duration_var("CUECALLER_POLL_PERIOD", &v)?;
    }
    if let Some(v) = lookup("CUECALLER_POLL_TIMEOUT") {
        config.poll_timeout = parse_duration_var("CUECALLER_POLL_TIMEOUT", &v)?;
    }
    if let Some(v) = lookup("CUECALLER_FAILURE_THRESHOLD") {
        config.failure_threshold =
            v.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    field: "CUECALLER_FAILURE_THRESHOLD".to_string(),
                    value: v.clone(),
                    expected: "a positive integer".to_string(),
                })?;
    }
    if let Some(v) = lookup("CUECALLER_DATA_SOURCE_URL") {
        config.data_source.url = v;
    }
    if let Some(v) = lookup("CUECALLER_PACKS_DIR") {
        config.packs_dir = PathBuf::from(v);
    }
    Ok(())
}

fn parse_duration_var(name: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|e| ConfigError::InvalidValue {
        field: name.to_string(),
        value: value.to_string(),
        expected: format!("a duration such as \"1s\" ({e})"),
    })
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_error(path: &Path, e: &serde_yaml::Error) -> ConfigError {
    ConfigError::ParseError {
        path: path.to_path_buf(),
        line: e.location().map(|l| l.line()),
        message: e.to_string(),
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
