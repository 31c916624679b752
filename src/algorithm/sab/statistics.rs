//! Cohort statistics and summaries

use std::collections::BTreeMap;

use super::concordance::ConcordanceSummary;
use super::pipeline::CohortResult;
use crate::models::{Acquisition, SubCriterion};

/// Counts describing a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CohortStatistics {
    /// Encounters examined
    pub encounter_count: usize,
    /// Episodes detected, emitted or not
    pub episode_count: usize,
    /// Hospital-acquired by late onset
    pub late_onset_count: usize,
    /// Hospital-acquired by an early-onset sub-criterion
    pub early_onset_hospital_count: usize,
    /// Community-acquired
    pub community_count: usize,
    /// Early-onset hospital-acquired episodes meeting each sub-criterion
    pub criterion_counts: BTreeMap<SubCriterion, usize>,
    /// Emitted rows with linked hypotension
    pub linked_count: usize,
    /// Hospital-acquired episodes dropped without hypotension
    pub dropped_count: usize,
    /// Episodes whose encounter carries a reference diagnosis code
    pub coded_episode_count: usize,
}

impl CohortStatistics {
    /// Tally a pipeline result
    #[must_use]
    pub fn from_result(result: &CohortResult) -> Self {
        let mut stats = Self {
            encounter_count: result.encounter_count,
            dropped_count: result.dropped.len(),
            linked_count: result
                .records
                .iter()
                .filter(|record| record.hypotension.is_some())
                .count(),
            ..Self::default()
        };

        for episode in result.episodes() {
            stats.episode_count += 1;
            if episode.has_relevant_diagnosis_code {
                stats.coded_episode_count += 1;
            }
            match &episode.acquisition {
                Acquisition::LateOnset => stats.late_onset_count += 1,
                Acquisition::Community => stats.community_count += 1,
                Acquisition::EarlyOnset(criteria) => {
                    stats.early_onset_hospital_count += 1;
                    for criterion in criteria.iter() {
                        *stats.criterion_counts.entry(criterion).or_insert(0) += 1;
                    }
                }
            }
        }
        stats
    }

    /// Hospital-acquired episodes of either onset
    #[must_use]
    pub fn hospital_count(&self) -> usize {
        self.late_onset_count + self.early_onset_hospital_count
    }
}

/// Human-readable run summary
#[must_use]
pub fn generate_summary(stats: &CohortStatistics, concordance: &ConcordanceSummary) -> String {
    let mut summary = String::new();
    summary.push_str("SAB Cohort Summary:\n");
    summary.push_str(&format!("  Encounters: {}\n", stats.encounter_count));
    summary.push_str(&format!("  Episodes: {}\n", stats.episode_count));
    summary.push_str(&format!(
        "  Hospital-Acquired: {} (late onset {}, early onset {})\n",
        stats.hospital_count(),
        stats.late_onset_count,
        stats.early_onset_hospital_count
    ));
    summary.push_str(&format!("  Community-Acquired: {}\n", stats.community_count));

    if !stats.criterion_counts.is_empty() {
        summary.push_str("\nEarly-Onset Sub-Criteria:\n");
        for criterion in SubCriterion::ALL {
            let count = stats.criterion_counts.get(&criterion).copied().unwrap_or(0);
            summary.push_str(&format!("  {criterion}: {count}\n"));
        }
    }

    summary.push_str("\nHypotension Linkage:\n");
    summary.push_str(&format!("  Linked: {}\n", stats.linked_count));
    summary.push_str(&format!(
        "  Dropped (hospital-acquired, unlinked): {}\n",
        stats.dropped_count
    ));

    summary.push_str("\nDiagnosis Code Concordance:\n");
    summary.push_str(&format!(
        "  Episodes with reference code: {}\n",
        stats.coded_episode_count
    ));
    summary.push_str(&format!("{concordance}\n"));

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ClassifiedCohortRecord, CriterionEvidence, EncounterKey, SabEpisode, SubCriteria,
    };
    use chrono::NaiveDate;

    fn episode(hadm_id: i64, acquisition: Acquisition) -> SabEpisode {
        SabEpisode {
            key: EncounterKey::new(1, hadm_id),
            sentinel_time: NaiveDate::from_ymd_opt(2150, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            sentinel_record_id: 0,
            acquisition,
            evidence: CriterionEvidence::default(),
            has_relevant_diagnosis_code: hadm_id == 1,
        }
    }

    #[test]
    fn test_statistics_from_result() {
        let criteria: SubCriteria = [SubCriterion::Device, SubCriterion::Invasive]
            .into_iter()
            .collect();
        let result = CohortResult {
            records: vec![
                ClassifiedCohortRecord {
                    episode: episode(1, Acquisition::EarlyOnset(criteria)),
                    hypotension: None,
                },
                ClassifiedCohortRecord {
                    episode: episode(2, Acquisition::Community),
                    hypotension: None,
                },
            ],
            dropped: vec![episode(3, Acquisition::LateOnset)],
            concordance: ConcordanceSummary::default(),
            encounter_count: 5,
        };

        let stats = CohortStatistics::from_result(&result);
        assert_eq!(stats.episode_count, 3);
        assert_eq!(stats.hospital_count(), 2);
        assert_eq!(stats.community_count, 1);
        assert_eq!(stats.criterion_counts[&SubCriterion::Device], 1);
        assert!(!stats.criterion_counts.contains_key(&SubCriterion::Surgery));
        assert_eq!(stats.dropped_count, 1);
        assert_eq!(stats.coded_episode_count, 1);

        let summary = generate_summary(&stats, &result.concordance);
        assert!(summary.contains("Community-Acquired: 1"));
        assert!(summary.contains("Invasive: 1"));
    }
}
