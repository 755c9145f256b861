//! One-shot reporting of unusable cues.

use std::collections::HashSet;

use super::evaluator::CueWarning;

/// Remembers which (cue, configuration) pairs were already reported.
///
/// Editing a cue changes its fingerprint, so a cue that is broken again
/// after an edit is reported again.
#[derive(Debug, Default)]
pub struct WarningLedger {
    reported: HashSet<(String, u64)>,
}

impl WarningLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only warnings not reported before, marking them reported.
    pub fn fresh<'a>(&mut self, warnings: &'a [CueWarning]) -> Vec<&'a CueWarning> {
        warnings
            .iter()
            .filter(|w| self.reported.insert((w.cue_id.clone(), w.fingerprint)))
            .collect()
    }

    /// Forgets cues not in `live_ids`.
    pub fn retain<'a>(&mut self, live_ids: impl IntoIterator<Item = &'a str>) {
        let live: HashSet<&str> = live_ids.into_iter().collect();
        self.reported.retain(|(id, _)| live.contains(id.as_str()));
    }
}
