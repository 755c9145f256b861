//! `cue`: list, add, edit and remove the cues of a pack.

use crate::cli::args::{CueCommand, CueSubcommand, OptionalTriggerArgs, OutputFormat, TriggerArgs};
use crate::cue::{CueEdit, NewCue, TriggerRule};
use crate::error::CueCallerError;

/// Runs a cue subcommand against `--pack` or the active pack.
///
/// # Errors
///
/// Returns a usage error for an invalid trigger, a config error for a bad
/// config file, or a repository error from the underlying operation.
pub fn run(cmd: &CueCommand) -> Result<(), CueCallerError> {
    let (_, service) = super::open_service(&cmd.store)?;
    let pack_id = cmd
        .pack
        .clone()
        .unwrap_or_else(|| service.store().snapshot().id.clone());

    match &cmd.subcommand {
        CueSubcommand::List(args) => {
            let pack = service.pack(&pack_id)?;
            match args.format {
                OutputFormat::Human => {
                    for cue in &pack.cues {
                        let trigger = cue
                            .rule()
                            .map_or_else(|e| format!("invalid: {e}"), |r| r.describe());
                        println!("{}  {:<20}  {}", cue.id, trigger, cue.text);
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pack.cues)?),
            }
        }
        CueSubcommand::Add { text, trigger } => {
            if text.trim().is_empty() {
                return Err(CueCallerError::Usage("cue text cannot be empty".to_string()));
            }
            let rule = required_rule(trigger)?;
            let cue = service.add_cue(&pack_id, NewCue {
                text: text.clone(),
                rule,
            })?;
            println!("{}", cue.id);
        }
        CueSubcommand::Edit { id, text, trigger } => {
            let edit = CueEdit {
                text: text.clone(),
                rule: optional_rule(trigger)?,
            };
            if edit.text.is_none() && edit.rule.is_none() {
                return Err(CueCallerError::Usage(
                    "nothing to change: pass --text or a trigger flag".to_string(),
                ));
            }
            if edit.text.as_deref().is_some_and(|t| t.trim().is_empty()) {
                return Err(CueCallerError::Usage("cue text cannot be empty".to_string()));
            }
            service.edit_cue(&pack_id, id, edit)?;
        }
        CueSubcommand::Remove { id } => {
            service.remove_cue(&pack_id, id)?;
        }
    }
    Ok(())
}

fn required_rule(args: &TriggerArgs) -> Result<TriggerRule, CueCallerError> {
    build_rule(
        args.interval,
        args.at,
        args.event.as_deref(),
        args.objective.as_deref(),
        args.before,
    )?
    .ok_or_else(|| CueCallerError::Usage("a trigger flag is required".to_string()))
}

fn optional_rule(args: &OptionalTriggerArgs) -> Result<Option<TriggerRule>, CueCallerError> {
    build_rule(
        args.interval,
        args.at,
        args.event.as_deref(),
        args.objective.as_deref(),
        args.before,
    )
}

/// Clap guarantees at most one trigger and that `--objective` comes with
/// `--before`.
fn build_rule(
    interval: Option<u64>,
    at: Option<u64>,
    event: Option<&str>,
    objective: Option<&str>,
    before: Option<u64>,
) -> Result<Option<TriggerRule>, CueCallerError> {
    let usage = |msg: &str| CueCallerError::Usage(msg.to_string());
    let rule = match (interval, at, event, objective) {
        (Some(0), ..) => return Err(usage("--interval must be greater than zero")),
        (Some(every), ..) => TriggerRule::Interval { every },
        (_, Some(at), ..) => TriggerRule::OneTime { at },
        (_, _, Some(name), _) => {
            if name.trim().is_empty() {
                return Err(usage("--event cannot be empty"));
            }
            TriggerRule::Event {
                name: name.trim().to_string(),
            }
        }
        (_, _, _, Some(name)) => {
            if name.trim().is_empty() {
                return Err(usage("--objective cannot be empty"));
            }
            let lead = before.ok_or_else(|| usage("--objective requires --before"))?;
            TriggerRule::Objective {
                name: name.trim().to_string(),
                lead,
            }
        }
        (None, None, None, None) => return Ok(None),
    };
    Ok(Some(rule))
}
