//! Closed trigger rule type.
//!
//! Every trigger kind the evaluator understands is a variant here, so
//! adding a kind forces every `match` over rules to be revisited.

use crate::error::CueConfigError;

use super::model::{Cue, TriggerType};

/// An evaluable trigger with exactly the parameters its kind needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerRule {
    /// Fire whenever `every` seconds have passed since the last firing,
    /// first at `game_time >= every`.
    Interval {
        /// Period in seconds (non-zero)
        every: u64,
    },
    /// Fire once when `game_time >= at`.
    OneTime {
        /// Game time in seconds
        at: u64,
    },
    /// Fire once when the named event is first observed.
    Event {
        /// Event name as reported by the data source
        name: String,
    },
    /// Fire once per objective occurrence, `lead` seconds before spawn.
    Objective {
        /// Objective name
        name: String,
        /// Seconds before spawn
        lead: u64,
    },
}

impl TriggerRule {
    /// The persisted trigger type for this rule.
    #[must_use]
    pub const fn trigger_type(&self) -> TriggerType {
        match self {
            Self::Interval { .. } => TriggerType::Interval,
            Self::OneTime { .. } => TriggerType::OneTime,
            Self::Event { .. } => TriggerType::Event,
            Self::Objective { .. } => TriggerType::Objective,
        }
    }

    /// Builds a rule from a cue's flat fields, ignoring parameters that do
    /// not belong to its trigger type.
    ///
    /// # Errors
    ///
    /// Returns [`CueConfigError`] for missing, zero or blank parameters.
    pub fn from_cue(cue: &Cue) -> Result<Self, CueConfigError> {
        let trigger = cue.trigger_type.as_str();
        match cue.trigger_type {
            TriggerType::Interval => {
                let every = cue.interval.ok_or(CueConfigError::MissingParameter {
                    trigger,
                    field: "interval",
                })?;
                if every == 0 {
                    return Err(CueConfigError::InvalidParameter {
                        trigger,
                        field: "interval",
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Ok(Self::Interval { every })
            }
            TriggerType::OneTime => {
                let at = cue.trigger_at.ok_or(CueConfigError::MissingParameter {
                    trigger,
                    field: "triggerAt",
                })?;
                Ok(Self::OneTime { at })
            }
            TriggerType::Event => {
                let name = non_blank(cue.event.as_deref(), trigger, "event")?;
                Ok(Self::Event { name })
            }
            TriggerType::Objective => {
                let name = non_blank(cue.objective.as_deref(), trigger, "objective")?;
                let lead = cue
                    .before_objective
                    .ok_or(CueConfigError::MissingParameter {
                        trigger,
                        field: "beforeObjective",
                    })?;
                Ok(Self::Objective { name, lead })
            }
        }
    }

    /// Short human description, e.g. `"every 30s"`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Interval { every } => format!("every {every}s"),
            Self::OneTime { at } => format!("at {at}s"),
            Self::Event { name } => format!("on event {name}"),
            Self::Objective { name, lead } => format!("{lead}s before {name}"),
        }
    }
}

fn non_blank(
    value: Option<&str>,
    trigger: &'static str,
    field: &'static str,
) -> Result<String, CueConfigError> {
    let value = value.ok_or(CueConfigError::MissingParameter { trigger, field })?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CueConfigError::InvalidParameter {
            trigger,
            field,
            reason: "must not be blank".to_string(),
        });
    }
    Ok(trimmed.to_string())
}
