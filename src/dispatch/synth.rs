//! Text-to-speech synthesis.
//!
//! [`CommandSynthesizer`] shells out to an external TTS program (espeak-ng
//! by default) that writes a WAV file. File names are derived from the
//! text alone, so identical text always maps to the same file.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::SynthesisError;

use super::render_command;

/// Maximum length of the readable part of an audio file name.
const MAX_SLUG_LEN: usize = 40;

/// Turns text into an audio file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesises `text` and returns the path of the audio file.
    async fn generate(&self, text: &str) -> Result<PathBuf, SynthesisError>;
}

/// Deterministic audio file name for `text`.
///
/// A readable slug of at most 40 characters plus a hash suffix, e.g.
/// `"dragon-spawns-soon-1b4e28ba2fa1.wav"`.
#[must_use]
pub fn audio_file_name(text: &str) -> String {
    let mut slug = String::with_capacity(MAX_SLUG_LEN);
    for c in text.chars() {
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    let slug = if slug.is_empty() { "cue" } else { slug };

    let digest = Uuid::new_v5(&Uuid::NAMESPACE_URL, text.as_bytes()).simple().to_string();
    format!("{slug}-{}.wav", &digest[..12])
}

/// Runs an argv template with `{text}` and `{output}` placeholders.
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    command: Vec<String>,
    output_dir: PathBuf,
    timeout: Duration,
}

impl CommandSynthesizer {
    /// Creates a synthesizer writing into `output_dir`.
    #[must_use]
    pub fn new(command: Vec<String>, output_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            command,
            output_dir: output_dir.into(),
            timeout,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn generate(&self, text: &str) -> Result<PathBuf, SynthesisError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| SynthesisError::Io(format!("{}: {e}", self.output_dir.display())))?;

        let output = self.output_dir.join(audio_file_name(text));
        let output_str = output.to_string_lossy();
        let argv = render_command(&self.command, &[("{text}", text), ("{output}", &output_str)]);
        let Some((program, args)) = argv.split_first() else {
            return Err(SynthesisError::SpawnFailed("empty command".to_string()));
        };

        debug!(program = %program, output = %output.display(), "synthesising speech");

        let child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SynthesisError::SpawnFailed(format!("{program}: {e}")))?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| SynthesisError::Timeout(self.timeout))?
            .map_err(|e| SynthesisError::SpawnFailed(e.to_string()))?;

        let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
        if !result.status.success() {
            return Err(SynthesisError::NonZeroExit {
                code: result.status.code(),
                stderr,
            });
        }
        if !stderr.is_empty() {
            warn!(program = %program, stderr = %stderr, "synthesizer produced stderr output");
        }

        match tokio::fs::metadata(&output).await {
            Ok(meta) if meta.is_file() => Ok(output),
            _ => Err(SynthesisError::MissingOutput(output)),
        }
    }
}
