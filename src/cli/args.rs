//! CLI argument definitions.
//!
//! All Clap derive structs for `cuecaller` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Speaks timed, recurring, event and objective reminders during a live game.
#[derive(Parser, Debug)]
#[command(name = "cuecaller", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "CUECALLER_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(long, default_value = "human", global = true, env = "CUECALLER_LOG_FORMAT")]
    pub log_format: LogFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the live game and speak cues from the active pack.
    Run(RunArgs),

    /// Validate engine configs and cue packs without running.
    Validate(ValidateArgs),

    /// Manage cue packs.
    Pack(PackCommand),

    /// Manage the cues of a pack.
    Cue(CueCommand),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version and build information.
    Version(VersionArgs),
}

/// Where packs live; shared by every pack-touching command.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Path to the engine configuration file.
    #[arg(short, long, global = true, env = "CUECALLER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cue pack directory (overrides the config file).
    #[arg(long, global = true)]
    pub packs_dir: Option<PathBuf>,
}

// ============================================================================
// Run / Validate
// ============================================================================

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Config file and pack directory.
    #[command(flatten)]
    pub store: StoreArgs,

    /// Activate this pack before starting.
    #[arg(short, long)]
    pub pack: Option<String>,

    /// Replay a recorded poll script instead of polling the game client.
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Write structured JSONL events to this file instead of stderr.
    #[arg(long, env = "CUECALLER_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "CUECALLER_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Engine configs or cue packs to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

// ============================================================================
// Pack Command
// ============================================================================

/// Pack management commands.
#[derive(Args, Debug)]
pub struct PackCommand {
    /// Config file and pack directory.
    #[command(flatten)]
    pub store: StoreArgs,

    /// Pack subcommand.
    #[command(subcommand)]
    pub subcommand: PackSubcommand,
}

/// Pack subcommands.
#[derive(Subcommand, Debug)]
pub enum PackSubcommand {
    /// List packs.
    List(ListArgs),

    /// Create an empty pack.
    Create {
        /// Display name; the id is derived from it.
        name: String,
    },

    /// Delete a pack. The personal pack cannot be deleted.
    Delete {
        /// Pack id.
        id: String,
    },

    /// Make a pack the active one.
    Activate {
        /// Pack id.
        id: String,
    },
}

/// Arguments for listing commands.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Cue Command
// ============================================================================

/// Cue management commands.
#[derive(Args, Debug)]
pub struct CueCommand {
    /// Config file and pack directory.
    #[command(flatten)]
    pub store: StoreArgs,

    /// Pack to operate on (defaults to the active pack).
    #[arg(long, global = true)]
    pub pack: Option<String>,

    /// Cue subcommand.
    #[command(subcommand)]
    pub subcommand: CueSubcommand,
}

/// Cue subcommands.
#[derive(Subcommand, Debug)]
pub enum CueSubcommand {
    /// List the cues of a pack.
    List(ListArgs),

    /// Add a cue.
    Add {
        /// Text to speak.
        text: String,

        /// When it fires.
        #[command(flatten)]
        trigger: TriggerArgs,
    },

    /// Edit a cue's text or trigger.
    Edit {
        /// Cue id.
        id: String,

        /// New text to speak.
        #[arg(long)]
        text: Option<String>,

        /// New trigger.
        #[command(flatten)]
        trigger: OptionalTriggerArgs,
    },

    /// Remove a cue.
    Remove {
        /// Cue id.
        id: String,
    },
}

/// Exactly one trigger.
#[derive(Args, Debug, Clone, Default)]
#[command(group = clap::ArgGroup::new("trigger").required(true).multiple(false))]
pub struct TriggerArgs {
    /// Fire every N seconds of game time.
    #[arg(long, value_name = "SECS", group = "trigger")]
    pub interval: Option<u64>,

    /// Fire once at this game time in seconds.
    #[arg(long, value_name = "SECS", group = "trigger")]
    pub at: Option<u64>,

    /// Fire once when this game event first occurs.
    #[arg(long, value_name = "NAME", group = "trigger")]
    pub event: Option<String>,

    /// Fire before each spawn of this objective (use with --before).
    #[arg(long, value_name = "NAME", group = "trigger", requires = "before")]
    pub objective: Option<String>,

    /// Seconds before the objective spawns.
    #[arg(long, value_name = "SECS", requires = "objective")]
    pub before: Option<u64>,
}

/// At most one trigger.
#[derive(Args, Debug, Clone, Default)]
#[command(group = clap::ArgGroup::new("trigger").multiple(false))]
pub struct OptionalTriggerArgs {
    /// Fire every N seconds of game time.
    #[arg(long, value_name = "SECS", group = "trigger")]
    pub interval: Option<u64>,

    /// Fire once at this game time in seconds.
    #[arg(long, value_name = "SECS", group = "trigger")]
    pub at: Option<u64>,

    /// Fire once when this game event first occurs.
    #[arg(long, value_name = "NAME", group = "trigger")]
    pub event: Option<String>,

    /// Fire before each spawn of this objective (use with --before).
    #[arg(long, value_name = "NAME", group = "trigger", requires = "before")]
    pub objective: Option<String>,

    /// Seconds before the objective spawns.
    #[arg(long, value_name = "SECS", requires = "objective")]
    pub before: Option<u64>,
}

// ============================================================================
// Completions / Version
// ============================================================================

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================
