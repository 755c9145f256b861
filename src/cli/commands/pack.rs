//! `pack`: list, create, delete and activate cue packs.

use serde::Serialize;

use crate::cli::args::{OutputFormat, PackCommand, PackSubcommand};
use crate::cue::CuePack;
use crate::error::CueCallerError;

/// One row of `pack list --format json`.
#[derive(Debug, Serialize)]
struct PackSummary<'a> {
    id: &'a str,
    name: &'a str,
    active: bool,
    cues: usize,
}

impl<'a> From<&'a CuePack> for PackSummary<'a> {
    fn from(pack: &'a CuePack) -> Self {
        Self {
            id: &pack.id,
            name: &pack.name,
            active: pack.active,
            cues: pack.cues.len(),
        }
    }
}

/// Runs a pack subcommand.
///
/// # Errors
///
/// Returns a config error for a bad config file, or a repository error
/// from the underlying operation.
pub fn run(cmd: &PackCommand) -> Result<(), CueCallerError> {
    let (_, service) = super::open_service(&cmd.store)?;

    match &cmd.subcommand {
        PackSubcommand::List(args) => {
            let packs = service.list_packs()?;
            match args.format {
                OutputFormat::Human => {
                    for pack in &packs {
                        let marker = if pack.active { '*' } else { ' ' };
                        println!(
                            "{marker} {:<24} {} ({} cues)",
                            pack.id,
                            pack.name,
                            pack.cues.len()
                        );
                    }
                }
                OutputFormat::Json => {
                    let rows: Vec<PackSummary<'_>> = packs.iter().map(PackSummary::from).collect();
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                }
            }
        }
        PackSubcommand::Create { name } => {
            if name.trim().is_empty() {
                return Err(CueCallerError::Usage("pack name cannot be empty".to_string()));
            }
            let pack = service.create_pack(name)?;
            println!("{}", pack.id);
        }
        PackSubcommand::Delete { id } => service.delete_pack(id)?,
        PackSubcommand::Activate { id } => {
            service.activate(id)?;
        }
    }
    Ok(())
}
