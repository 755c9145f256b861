//! CLI command dispatch and handlers.
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod completions;
pub mod cue;
pub mod pack;
pub mod run;
pub mod validate;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, Commands, StoreArgs};
use crate::config::{ConfigLoader, EngineConfig};
use crate::cue::{PackService, YamlRepository};
use crate::error::CueCallerError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<(), CueCallerError> {
    match cli.command {
        Commands::Run(args) => run::run(&args, cancel).await,
        Commands::Validate(args) => validate::run(&args),
        Commands::Pack(cmd) => pack::run(&cmd),
        Commands::Cue(cmd) => cue::run(&cmd),
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}

/// Loads the engine config and opens the pack repository it points at.
///
/// # Errors
///
/// Returns a config error if the config file is invalid, or a repository
/// error if the pack directory cannot be read.
pub fn open_service(store: &StoreArgs) -> Result<(Arc<EngineConfig>, PackService), CueCallerError> {
    let loaded = ConfigLoader::with_defaults().load_or_default(store.config.as_deref())?;
    for warning in &loaded.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }

    let dir = packs_dir(store, &loaded.config);
    tracing::debug!(packs_dir = %dir.display(), "opening cue packs");
    let service = PackService::open(Arc::new(YamlRepository::new(dir)))?;
    Ok((loaded.config, service))
}

/// The packs directory: `--packs-dir` if given, else the config's.
#[must_use]
pub fn packs_dir(store: &StoreArgs, config: &EngineConfig) -> PathBuf {
    store
        .packs_dir
        .clone()
        .unwrap_or_else(|| config.packs_dir.clone())
}
