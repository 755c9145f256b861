//! Shared integration-test harness: runs the `cuecaller` binary inside a
//! throwaway workspace directory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};

/// Writes a WAV stand-in containing the cue text to `{output}`.
pub const FAKE_SYNTH: &str = r#"["sh", "-c", "printf '%s' \"$1\" > \"$0\"", "{output}", "{text}"]"#;

/// A temporary directory holding a config file and a pack directory.
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    /// Creates a workspace with a fast-polling config using a fake
    /// synthesizer and no playback command.
    #[allow(clippy::missing_panics_doc)]
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let config = format!(
            "poll_period: 20ms\npoll_timeout: 100ms\npacks_dir: packs\nsynthesis:\n  command: {FAKE_SYNTH}\n  output_dir: audio\n  timeout: 5s\n"
        );
        std::fs::write(dir.path().join("cuecaller.yaml"), config).expect("failed to write config");
        Self { dir }
    }

    /// Root of the workspace.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Pack directory inside the workspace.
    #[must_use]
    pub fn packs_dir(&self) -> PathBuf {
        self.dir.path().join("packs")
    }

    /// Copies a fixture pack into the pack directory.
    #[allow(clippy::missing_panics_doc)]
    pub fn install_pack(&self, fixture: &str) {
        std::fs::create_dir_all(self.packs_dir()).expect("failed to create packs dir");
        std::fs::copy(fixture_path(fixture), self.packs_dir().join(fixture))
            .expect("failed to copy fixture pack");
    }

    /// Runs the binary with `args` from the workspace root.
    #[allow(clippy::missing_panics_doc)]
    #[must_use]
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_cuecaller"))
            .args(args)
            .current_dir(self.dir.path())
            .env_remove("CUECALLER_CONFIG")
            .env_remove("CUECALLER_LOG_LEVEL")
            .output()
            .expect("failed to run cuecaller")
    }

    /// Starts the binary with `args` from the workspace root without
    /// waiting for it. Stdout and stderr are piped.
    #[allow(clippy::missing_panics_doc)]
    #[must_use]
    pub fn spawn(&self, args: &[&str]) -> Child {
        Command::new(env!("CARGO_BIN_EXE_cuecaller"))
            .args(args)
            .current_dir(self.dir.path())
            .env_remove("CUECALLER_CONFIG")
            .env_remove("CUECALLER_LOG_LEVEL")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to start cuecaller")
    }

    /// Reads a pack file back as YAML.
    #[allow(clippy::missing_panics_doc)]
    #[must_use]
    pub fn read_pack(&self, id: &str) -> serde_yaml::Value {
        let raw = std::fs::read_to_string(self.packs_dir().join(format!("{id}.yaml")))
            .expect("pack file missing");
        serde_yaml::from_str(&raw).expect("pack file is not YAML")
    }
}

/// Runs the binary outside any workspace.
#[allow(clippy::missing_panics_doc)]
#[must_use]
pub fn run_command(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cuecaller"))
        .args(args)
        .env_remove("CUECALLER_CONFIG")
        .output()
        .expect("failed to run cuecaller")
}

/// Returns the path to a test fixture.
#[must_use]
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Stdout as text.
#[must_use]
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Stderr as text.
#[must_use]
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
