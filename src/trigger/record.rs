//! Per-session firing history.

use std::collections::BTreeMap;

/// What a cue has already done this session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FiringRecord {
    /// Interval cue; game time of the last firing
    Interval {
        /// Observed tick time of the last firing
        last_fired: f64,
    },
    /// One-time or event cue that has fired
    Fired,
    /// Objective cue; occurrence it last fired for
    Objective {
        /// Occurrence id reported with the timer
        occurrence: u64,
    },
}

/// Firing records keyed by cue id.
///
/// The evaluator never mutates a map it was given; it returns a new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FiringRecords {
    records: BTreeMap<String, FiringRecord>,
}

impl FiringRecords {
    /// Empty history, as at the start of a session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for a cue, if any.
    #[must_use]
    pub fn get(&self, cue_id: &str) -> Option<&FiringRecord> {
        self.records.get(cue_id)
    }

    /// Number of cues with a record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no cue has fired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn insert(&mut self, cue_id: &str, record: FiringRecord) {
        self.records.insert(cue_id.to_string(), record);
    }
}
