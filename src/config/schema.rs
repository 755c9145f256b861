//! Engine configuration schema.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. Durations are human strings such as `"1s"` or `"750ms"`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::source::objectives::ObjectiveSpec;

/// Default live client endpoint.
pub const DEFAULT_DATA_SOURCE_URL: &str = "https://127.0.0.1:2999/liveclientdata/allgamedata";

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Time between polls
    #[serde(with = "duration_str")]
    pub poll_period: Duration,

    /// A poll taking longer than this counts as failed
    #[serde(with = "duration_str")]
    pub poll_timeout: Duration,

    /// Consecutive failed polls that end a running session
    pub failure_threshold: u32,

    /// Live client endpoint settings
    pub data_source: DataSourceConfig,

    /// Text-to-speech command
    pub synthesis: SynthesisConfig,

    /// Audio player command
    pub playback: PlaybackConfig,

    /// Directory holding cue pack files
    pub packs_dir: PathBuf,

    /// Objective metadata used to derive spawn timers
    pub objectives: Vec<ObjectiveSpec>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_period: Duration::from_secs(1),
            poll_timeout: Duration::from_secs(2),
            failure_threshold: crate::phase::tracker::DEFAULT_FAILURE_THRESHOLD,
            data_source: DataSourceConfig::default(),
            synthesis: SynthesisConfig::default(),
            playback: PlaybackConfig::default(),
            packs_dir: PathBuf::from("packs"),
            objectives: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Names of the configured objectives.
    #[must_use]
    pub fn objective_names(&self) -> Vec<String> {
        self.objectives.iter().map(|o| o.name.clone()).collect()
    }
}

/// Live client endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataSourceConfig {
    /// Full URL of the all-game-data endpoint
    pub url: String,

    /// The local game client serves a self-signed certificate
    pub accept_invalid_certs: bool,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATA_SOURCE_URL.to_string(),
            accept_invalid_certs: true,
        }
    }
}

/// Speech synthesis command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynthesisConfig {
    /// Argv template; `{text}` and `{output}` are substituted
    #[serde(deserialize_with = "argv::deserialize")]
    pub command: Vec<String>,

    /// Directory generated audio is written to
    pub output_dir: PathBuf,

    /// Upper bound on one synthesis run
    #[serde(with = "duration_str")]
    pub timeout: Duration,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            command: ["espeak-ng", "-w", "{output}", "{text}"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            output_dir: PathBuf::from("audio"),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Audio player command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackConfig {
    /// Argv template with a `{path}` placeholder. Absent means clips are
    /// only logged.
    #[serde(deserialize_with = "argv::deserialize_opt")]
    pub command: Option<Vec<String>>,
}

/// Durations as humantime strings.
mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&humantime::format_duration(*d).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}

/// Commands as a YAML list or a single shell-quoted string.
mod argv {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Command {
        Line(String),
        Argv(Vec<String>),
    }

    fn split(command: Command) -> Result<Vec<String>, String> {
        match command {
            Command::Argv(argv) => Ok(argv),
            Command::Line(line) => {
                shlex::split(&line).ok_or_else(|| format!("unbalanced quoting in command: {line}"))
            }
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        split(Command::deserialize(d)?).map_err(serde::de::Error::custom)
    }

    pub fn deserialize_opt<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<Vec<String>>, D::Error> {
        Option::<Command>::deserialize(d)?
            .map(split)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_all_defaults() {
        let config: EngineConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.poll_period, Duration::from_secs(1));
        assert!(config.playback.command.is_none());
    }

    #[test]
    fn test_durations_and_command_line() {
        let yaml = r#"
poll_period: 750ms
synthesis:
  command: "say -o {output} '{text}'"
  timeout: 1m
playback:
  command: [aplay, "{path}"]
objectives:
  - name: dragon
    kill_event: DragonKill
    first_spawn: 300
    respawn: 300
"#;
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.poll_period, Duration::from_millis(750));
        assert_eq!(config.synthesis.timeout, Duration::from_secs(60));
        assert_eq!(config.synthesis.command, ["say", "-o", "{output}", "{text}"]);
        assert_eq!(
            config.playback.command,
            Some(vec!["aplay".to_string(), "{path}".to_string()])
        );
        assert_eq!(config.objective_names(), ["dragon"]);
    }

    #[test]
    fn test_rejects_unknown_keys_and_bad_durations() {
        assert!(serde_yaml::from_str::<EngineConfig>("pol_period: 1s").is_err());
        assert!(serde_yaml::from_str::<EngineConfig>("poll_period: soon").is_err());
        assert!(
            serde_yaml::from_str::<EngineConfig>("synthesis: {command: \"say 'x\"}").is_err()
        );
    }

    #[test]
    fn test_serializes_durations_as_strings() {
        let yaml = serde_yaml::to_string(&EngineConfig::default()).unwrap();
        assert!(yaml.contains("poll_period: 1s"));
        let back: EngineConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, EngineConfig::default());
    }
}
