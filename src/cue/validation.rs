//! Static cue pack validation.
//!
//! Live evaluation never rejects a pack: an unusable cue simply does not
//! fire and is reported once. This validator is the stricter, offline
//! check behind `cuecaller validate`, and it collects every issue rather
//! than stopping at the first.

use std::collections::HashSet;

use crate::config::validation::ValidationResult;
use crate::error::{Severity, ValidationIssue};
use crate::source::KNOWN_EVENTS;

use super::model::CuePack;
use super::rule::TriggerRule;

/// Maximum edit distance for a "did you mean" suggestion.
const SUGGESTION_DISTANCE: usize = 3;

/// Cue pack validator.
#[derive(Debug, Default)]
pub struct PackValidator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl PackValidator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `pack`.
    ///
    /// `objectives` lists the objective names the engine is configured to
    /// track; when empty, objective names are not cross-checked.
    pub fn validate(&mut self, pack: &CuePack, objectives: &[String]) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        if pack.id.trim().is_empty() {
            self.add_error("id", "Pack id cannot be empty");
        }
        if pack.name.trim().is_empty() {
            self.add_warning("name", "Pack has no display name");
        }

        let mut seen = HashSet::new();
        for (idx, cue) in pack.cues.iter().enumerate() {
            let path = format!("cues[{idx}]");

            if cue.id.trim().is_empty() {
                self.add_error(&format!("{path}.id"), "Cue id cannot be empty");
            } else if !seen.insert(cue.id.as_str()) {
                self.add_error(
                    &format!("{path}.id"),
                    &format!("Duplicate cue id '{}'", cue.id),
                );
            }

            if cue.text.trim().is_empty() {
                self.add_error(&format!("{path}.text"), "Cue text cannot be empty");
            }

            match cue.rule() {
                Err(e) => self.add_error(&path, &e.to_string()),
                Ok(TriggerRule::Event { name }) => {
                    self.validate_event_name(&name, &format!("{path}.event"));
                }
                Ok(TriggerRule::Objective { name, .. }) if !objectives.is_empty() => {
                    self.validate_objective_name(&name, objectives, &format!("{path}.objective"));
                }
                Ok(_) => {}
            }
        }

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    fn validate_event_name(&mut self, event: &str, path: &str) {
        if KNOWN_EVENTS.iter().any(|k| k.eq_ignore_ascii_case(event)) {
            return;
        }
        let mut message = format!("Unknown event name '{event}'; this cue may never fire");
        if let Some(hint) = suggest(event, KNOWN_EVENTS.iter().copied()) {
            message.push_str(&format!(". Did you mean '{hint}'?"));
        }
        self.add_warning(path, &message);
    }

    fn validate_objective_name(&mut self, name: &str, objectives: &[String], path: &str) {
        if objectives.iter().any(|o| o.eq_ignore_ascii_case(name)) {
            return;
        }
        let mut message = format!("Objective '{name}' is not configured; this cue will never fire");
        if let Some(hint) = suggest(name, objectives.iter().map(String::as_str)) {
            message.push_str(&format!(". Did you mean '{hint}'?"));
        }
        self.add_warning(path, &message);
    }

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

/// Closest candidate within [`SUGGESTION_DISTANCE`] edits, compared
/// case-insensitively.
fn suggest<'a>(input: &str, candidates: impl Iterator<Item = &'a str>) -> Option<String> {
    let lowered = input.to_ascii_lowercase();
    candidates
        .map(|c| (c, strsim::damerau_levenshtein(&lowered, &c.to_ascii_lowercase())))
        .filter(|(_, dist)| *dist <= SUGGESTION_DISTANCE)
        .min_by_key(|(_, dist)| *dist)
        .map(|(name, _)| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue::{Cue, TriggerType};

    fn pack(cues: Vec<Cue>) -> CuePack {
        let mut pack = CuePack::new("p", "Pack");
        pack.cues = cues;
        pack
    }

    #[test]
    fn test_valid_pack() {
        let result = PackValidator::new().validate(
            &pack(vec![
                Cue::with_id("a", "ward", &TriggerRule::Interval { every: 60 }),
                Cue::with_id("b", "gg", &TriggerRule::Event {
                    name: "DragonKill".to_string(),
                }),
            ]),
            &[],
        );
        assert!(result.is_valid());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_duplicate_ids_and_empty_text() {
        let rule = TriggerRule::OneTime { at: 5 };
        let result = PackValidator::new().validate(
            &pack(vec![
                Cue::with_id("a", "one", &rule),
                Cue::with_id("a", "  ", &rule),
            ]),
            &[],
        );
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().any(|e| e.message.contains("Duplicate")));
        assert!(result.errors.iter().any(|e| e.path == "cues[1].text"));
    }

    #[test]
    fn test_invalid_rule_is_error() {
        let mut cue = Cue::with_id("a", "baron", &TriggerRule::OneTime { at: 5 });
        cue.trigger_type = TriggerType::Objective;
        cue.objective = Some("baron".to_string());
        let result = PackValidator::new().validate(&pack(vec![cue]), &[]);
        assert!(result.has_errors());
        assert!(result.errors[0].message.contains("beforeObjective"));
    }

    #[test]
    fn test_unknown_event_suggests_closest() {
        let result = PackValidator::new().validate(
            &pack(vec![Cue::with_id("a", "x", &TriggerRule::Event {
                name: "DragonKil".to_string(),
            })]),
            &[],
        );
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.contains("Did you mean 'DragonKill'"));
    }

    #[test]
    fn test_event_names_match_case_insensitively() {
        let result = PackValidator::new().validate(
            &pack(vec![Cue::with_id("a", "x", &TriggerRule::Event {
                name: "baronkill".to_string(),
            })]),
            &[],
        );
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_unconfigured_objective_warns() {
        let objectives = vec!["dragon".to_string(), "baron".to_string()];
        let result = PackValidator::new().validate(
            &pack(vec![Cue::with_id("a", "x", &TriggerRule::Objective {
                name: "dragn".to_string(),
                lead: 30,
            })]),
            &objectives,
        );
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.contains("'dragon'"));
    }
}
