//! Cue and cue pack data types.
//!
//! These are the persisted shapes: a cue stores its trigger as a flat
//! `triggerType` plus optional parameters, exactly as cue packs are written
//! to disk. The evaluator never reads the flat fields directly; it goes
//! through [`Cue::rule`], which yields a closed [`TriggerRule`].

use std::hash::{DefaultHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CueConfigError;

use super::rule::TriggerRule;

/// Id of the pack that always exists and cannot be deleted.
pub const PERSONAL_PACK_ID: &str = "personal";

/// Kind of trigger a cue uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerType {
    /// Fires every `interval` seconds of game time
    Interval,
    /// Fires once at `triggerAt` seconds of game time
    OneTime,
    /// Fires once when the named game event is observed
    Event,
    /// Fires once per occurrence, `beforeObjective` seconds before spawn
    Objective,
}

impl TriggerType {
    /// Name used in diagnostics, metrics labels and pack files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interval => "interval",
            Self::OneTime => "oneTime",
            Self::Event => "event",
            Self::Objective => "objective",
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured reminder.
///
/// Only the parameters relevant to `trigger_type` are meaningful; the
/// others are carried through storage untouched and ignored by the
/// evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cue {
    /// Stable unique id within the pack
    pub id: String,

    /// Text spoken when the cue fires
    pub text: String,

    /// Synthesised audio for `text`, filled in lazily on first firing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,

    /// Trigger kind
    pub trigger_type: TriggerType,

    /// Seconds between firings (`interval`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,

    /// Game time in seconds to fire at (`oneTime`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_at: Option<u64>,

    /// Game event name (`event`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,

    /// Objective name (`objective`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,

    /// Lead time in seconds before the objective spawns (`objective`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_objective: Option<u64>,
}

impl Cue {
    /// Creates a cue with a fresh random id from a trigger rule.
    #[must_use]
    pub fn new(text: impl Into<String>, rule: &TriggerRule) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), text, rule)
    }

    /// Creates a cue with an explicit id.
    #[must_use]
    pub fn with_id(id: impl Into<String>, text: impl Into<String>, rule: &TriggerRule) -> Self {
        let mut cue = Self {
            id: id.into(),
            text: text.into(),
            audio_url: None,
            trigger_type: rule.trigger_type(),
            interval: None,
            trigger_at: None,
            event: None,
            objective: None,
            before_objective: None,
        };
        cue.set_rule(rule);
        cue
    }

    /// Replaces the trigger, clearing parameters of the previous kind.
    pub fn set_rule(&mut self, rule: &TriggerRule) {
        self.trigger_type = rule.trigger_type();
        self.interval = None;
        self.trigger_at = None;
        self.event = None;
        self.objective = None;
        self.before_objective = None;
        match rule {
            TriggerRule::Interval { every } => self.interval = Some(*every),
            TriggerRule::OneTime { at } => self.trigger_at = Some(*at),
            TriggerRule::Event { name } => self.event = Some(name.clone()),
            TriggerRule::Objective { name, lead } => {
                self.objective = Some(name.clone());
                self.before_objective = Some(*lead);
            }
        }
    }

    /// Resolves the flat trigger fields into an evaluable rule.
    ///
    /// # Errors
    ///
    /// Returns [`CueConfigError`] when a parameter required by the
    /// trigger type is missing or unusable.
    pub fn rule(&self) -> Result<TriggerRule, CueConfigError> {
        TriggerRule::from_cue(self)
    }

    /// Hash of everything that decides whether and when the cue fires.
    ///
    /// Changes whenever the cue is edited in a way that could repair (or
    /// break) its trigger configuration.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.trigger_type.hash(&mut hasher);
        self.interval.hash(&mut hasher);
        self.trigger_at.hash(&mut hasher);
        self.event.hash(&mut hasher);
        self.objective.hash(&mut hasher);
        self.before_objective.hash(&mut hasher);
        hasher.finish()
    }
}

/// A named, ordered collection of cues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuePack {
    /// Stable pack id (also the storage key)
    pub id: String,

    /// Display name
    pub name: String,

    /// Whether this pack drives live evaluation
    #[serde(default)]
    pub active: bool,

    /// Cues in stored order; this order is the firing order within a tick
    #[serde(default)]
    pub cues: Vec<Cue>,
}

impl CuePack {
    /// Creates an empty, inactive pack.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            active: false,
            cues: Vec::new(),
        }
    }

    /// Creates the empty personal pack.
    #[must_use]
    pub fn personal() -> Self {
        Self::new(PERSONAL_PACK_ID, "Personal")
    }

    /// Whether this is the protected personal pack.
    #[must_use]
    pub fn is_personal(&self) -> bool {
        self.id == PERSONAL_PACK_ID
    }

    /// Looks up a cue by id.
    #[must_use]
    pub fn cue(&self, cue_id: &str) -> Option<&Cue> {
        self.cues.iter().find(|c| c.id == cue_id)
    }

    /// Looks up a cue by id for mutation.
    pub fn cue_mut(&mut self, cue_id: &str) -> Option<&mut Cue> {
        self.cues.iter_mut().find(|c| c.id == cue_id)
    }

    /// Appends a cue. Returns `false` (and leaves the pack unchanged) if
    /// a cue with the same id already exists.
    pub fn push_cue(&mut self, cue: Cue) -> bool {
        if self.cue(&cue.id).is_some() {
            return false;
        }
        self.cues.push(cue);
        true
    }

    /// Removes a cue by id, preserving the order of the rest.
    pub fn remove_cue(&mut self, cue_id: &str) -> Option<Cue> {
        let idx = self.cues.iter().position(|c| c.id == cue_id)?;
        Some(self.cues.remove(idx))
    }
}
