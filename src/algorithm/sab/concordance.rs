//! Diagnosis-code concordance
//!
//! Annotates episodes with whether their encounter carries one of the
//! reference diagnosis codes, and tabulates cohort membership against that
//! label. Annotation never changes cohort membership.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::collections::EncounterEvents;
use crate::models::{EncounterKey, SabEpisode};

/// Set the diagnosis-code flag of `episode` from its encounter
pub fn annotate(episode: &mut SabEpisode, events: &EncounterEvents<'_>) {
    episode.has_relevant_diagnosis_code = events.has_reference_diagnosis;
}

/// Two-by-two table of SAB episode presence against the diagnosis-code label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcordanceSummary {
    /// Episode detected and code present
    pub both: usize,
    /// Episode detected, no code
    pub cohort_only: usize,
    /// Code present, no episode
    pub code_only: usize,
    /// Neither
    pub neither: usize,
}

impl ConcordanceSummary {
    /// Tabulate over every encounter of the index
    #[must_use]
    pub fn tabulate<'e>(
        encounters: &[EncounterEvents<'_>],
        episodes: impl IntoIterator<Item = &'e SabEpisode>,
    ) -> Self {
        let with_episode: FxHashSet<EncounterKey> =
            episodes.into_iter().map(|episode| episode.key).collect();

        let mut summary = Self::default();
        for events in encounters {
            match (
                with_episode.contains(&events.key()),
                events.has_reference_diagnosis,
            ) {
                (true, true) => summary.both += 1,
                (true, false) => summary.cohort_only += 1,
                (false, true) => summary.code_only += 1,
                (false, false) => summary.neither += 1,
            }
        }
        summary
    }

    /// Share of episodes the code label finds; `None` without episodes
    #[must_use]
    pub fn sensitivity(&self) -> Option<f64> {
        ratio(self.both, self.both + self.cohort_only)
    }

    /// Share of coded encounters that have an episode; `None` without codes
    #[must_use]
    pub fn positive_predictive_value(&self) -> Option<f64> {
        ratio(self.both, self.both + self.code_only)
    }

    /// Number of encounters tabulated
    #[must_use]
    pub fn total(&self) -> usize {
        self.both + self.cohort_only + self.code_only + self.neither
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

impl fmt::Display for ConcordanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let percent = |value: Option<f64>| {
            value.map_or_else(|| "n/a".to_string(), |v| format!("{:.1}%", v * 100.0))
        };
        writeln!(f, "  Episode and code: {}", self.both)?;
        writeln!(f, "  Episode only: {}", self.cohort_only)?;
        writeln!(f, "  Code only: {}", self.code_only)?;
        writeln!(f, "  Neither: {}", self.neither)?;
        writeln!(f, "  Sensitivity: {}", percent(self.sensitivity()))?;
        write!(f, "  Positive predictive value: {}", percent(self.positive_predictive_value()))
    }
}
