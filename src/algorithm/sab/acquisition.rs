//! Acquisition classification
//!
//! Early-onset episodes are tested against four independent sub-criteria,
//! all evaluated at the sentinel time. Any true criterion makes the episode
//! hospital-acquired; none makes it community-acquired. Late-onset episodes
//! skip the criteria entirely.

use chrono::NaiveDate;
use itertools::Itertools;

use super::detection::DetectedEpisode;
use crate::collections::EncounterEvents;
use crate::config::PipelineConfig;
use crate::models::{
    Acquisition, CriterionEvidence, LabResult, OnsetCase, ProcedureInterval, SabEpisode,
    SubCriteria, SubCriterion, SurgicalProcedureRecord, Timestamp,
};

/// True sub-criteria of an early-onset episode and their details
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriteriaOutcome {
    /// Sub-criteria that evaluated true
    pub criteria: SubCriteria,
    pub evidence: CriterionEvidence,
}

/// Whether a device interval contains `time`, both ends inclusive.
///
/// `intervals` must be sorted by start time.
#[must_use]
pub fn device_at(intervals: &[&ProcedureInterval], time: Timestamp) -> bool {
    let started = intervals.partition_point(|interval| interval.start_time <= time);
    intervals[..started]
        .iter()
        .any(|interval| time <= interval.end_time)
}

/// Estimated time of the first surgery whose window contains `time`
#[must_use]
pub fn surgery_within(
    surgeries: &[SurgicalProcedureRecord],
    time: Timestamp,
    config: &PipelineConfig,
) -> Option<Timestamp> {
    let window = config.surgery_window();
    surgeries
        .iter()
        .find(|surgery| {
            surgery.estimated_time <= time
                && surgery
                    .estimated_time
                    .checked_add_signed(window)
                    .is_some_and(|end| time <= end)
        })
        .map(|surgery| surgery.estimated_time)
}

/// Start of the device procedure closest to `time` within the invasive window.
///
/// Ties on distance go to the earlier start. `intervals` must be sorted by
/// start time.
#[must_use]
pub fn invasive_near(
    intervals: &[&ProcedureInterval],
    time: Timestamp,
    config: &PipelineConfig,
) -> Option<Timestamp> {
    let window = config.invasive_window();
    let earliest = time.checked_sub_signed(window)?;
    let latest = time.checked_add_signed(window)?;
    let from = intervals.partition_point(|interval| interval.start_time < earliest);
    let to = intervals.partition_point(|interval| interval.start_time <= latest);

    intervals[from..to]
        .iter()
        .map(|interval| interval.start_time)
        .min_by_key(|start| ((*start - time).abs(), *start))
}

/// Number of distinct calendar days with a low ANC within the day window.
///
/// A window that leaves the calendar range counts no days.
#[must_use]
pub fn low_anc_days(results: &[&LabResult], time: Timestamp, config: &PipelineConfig) -> usize {
    let sentinel_date = time.date();
    let window = config.anc_window();
    let (Some(first), Some(last)) = (
        sentinel_date.checked_sub_signed(window),
        sentinel_date.checked_add_signed(window),
    ) else {
        return 0;
    };

    results
        .iter()
        .filter(|result| {
            result
                .value
                .is_some_and(|value| value < config.anc_threshold)
        })
        .map(|result| result.sample_time.date())
        .filter(|date: &NaiveDate| first <= *date && *date <= last)
        .unique()
        .count()
}

/// Evaluate every sub-criterion at `time`
#[must_use]
pub fn evaluate_criteria(
    events: &EncounterEvents<'_>,
    time: Timestamp,
    config: &PipelineConfig,
) -> CriteriaOutcome {
    let mut outcome = CriteriaOutcome::default();

    if device_at(&events.device_intervals, time) {
        outcome.criteria.insert(SubCriterion::Device);
        outcome.evidence.device_present = true;
    }

    if let Some(estimated) = surgery_within(&events.surgeries, time, config) {
        outcome.criteria.insert(SubCriterion::Surgery);
        outcome.evidence.estimated_surgery_time = Some(estimated);
    }

    if let Some(start) = invasive_near(&events.device_intervals, time, config) {
        outcome.criteria.insert(SubCriterion::Invasive);
        outcome.evidence.invasive_procedure_time = Some(start);
    }

    let days = low_anc_days(&events.anc_results, time, config);
    if days >= config.anc_min_days {
        outcome.criteria.insert(SubCriterion::Neutropenia);
        outcome.evidence.low_anc_days = u32::try_from(days).ok();
    }

    outcome
}

/// Classify a detected episode into a [`SabEpisode`]
#[must_use]
pub fn classify(
    detected: &DetectedEpisode<'_>,
    events: &EncounterEvents<'_>,
    config: &PipelineConfig,
) -> SabEpisode {
    let (acquisition, evidence) = match detected.onset {
        OnsetCase::Late => (Acquisition::LateOnset, CriterionEvidence::default()),
        OnsetCase::Early => {
            let outcome = evaluate_criteria(events, detected.sentinel_time(), config);
            (
                Acquisition::from_early_criteria(outcome.criteria),
                outcome.evidence,
            )
        }
    };

    SabEpisode {
        key: detected.key,
        sentinel_time: detected.sentinel_time(),
        sentinel_record_id: detected.sentinel.record_id,
        acquisition,
        evidence,
        has_relevant_diagnosis_code: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EncounterKey;
    use chrono::{NaiveDateTime, TimeDelta};

    fn admit() -> Timestamp {
        NaiveDate::from_ymd_opt(2150, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn device(record_id: u64, start_hours: i64, end_hours: i64) -> ProcedureInterval {
        ProcedureInterval {
            record_id,
            key: EncounterKey::new(1, 1),
            item_id: 225752,
            start_time: admit() + TimeDelta::hours(start_hours),
            end_time: admit() + TimeDelta::hours(end_hours),
        }
    }

    fn anc(record_id: u64, time: Timestamp, value: f64) -> LabResult {
        LabResult {
            record_id,
            key: EncounterKey::new(1, 1),
            item_id: 52075,
            sample_time: time,
            value: Some(value),
        }
    }

    #[test]
    fn test_device_interval_is_inclusive() {
        let intervals = [device(0, 2, 20)];
        let refs: Vec<&ProcedureInterval> = intervals.iter().collect();

        assert!(device_at(&refs, admit() + TimeDelta::hours(10)));
        assert!(device_at(&refs, admit() + TimeDelta::hours(2)));
        assert!(device_at(&refs, admit() + TimeDelta::hours(20)));
        assert!(!device_at(&refs, admit() + TimeDelta::hours(21)));
        assert!(!device_at(&refs, admit() + TimeDelta::hours(1)));
    }

    #[test]
    fn test_device_found_behind_later_starting_interval() {
        let intervals = [device(0, 0, 100), device(1, 5, 6)];
        let refs: Vec<&ProcedureInterval> = intervals.iter().collect();

        assert!(device_at(&refs, admit() + TimeDelta::hours(50)));
    }

    #[test]
    fn test_invasive_picks_closest_start() {
        let config = PipelineConfig::default();
        let intervals = [device(0, -30, -29), device(1, 4, 5), device(2, 70, 71)];
        let refs: Vec<&ProcedureInterval> = intervals.iter().collect();
        let sentinel = admit() + TimeDelta::hours(10);

        assert_eq!(
            invasive_near(&refs, sentinel, &config),
            Some(admit() + TimeDelta::hours(4))
        );
        assert_eq!(
            invasive_near(&refs, admit() + TimeDelta::hours(200), &config),
            None
        );
    }

    #[test]
    fn test_invasive_window_edges_are_inclusive() {
        let config = PipelineConfig::default();
        let intervals = [device(0, 58, 59)];
        let refs: Vec<&ProcedureInterval> = intervals.iter().collect();

        assert!(invasive_near(&refs, admit() + TimeDelta::hours(10), &config).is_some());
        assert!(invasive_near(&refs, admit() + TimeDelta::hours(9), &config).is_none());
    }

    #[test]
    fn test_surgery_window_starts_at_estimate() {
        let config = PipelineConfig::default();
        let surgeries = [SurgicalProcedureRecord {
            key: EncounterKey::new(1, 1),
            icd_code: "0DTJ4ZZ".to_string(),
            estimated_time: admit() + TimeDelta::days(1),
        }];

        assert!(surgery_within(&surgeries, admit() + TimeDelta::hours(12), &config).is_none());
        assert_eq!(
            surgery_within(&surgeries, admit() + TimeDelta::days(1), &config),
            Some(admit() + TimeDelta::days(1))
        );
        assert!(surgery_within(&surgeries, admit() + TimeDelta::days(30), &config).is_some());
        assert!(
            surgery_within(
                &surgeries,
                admit() + TimeDelta::days(30) + TimeDelta::seconds(1),
                &config
            )
            .is_none()
        );
    }

    #[test]
    fn test_low_anc_days_counts_distinct_dates() {
        let config = PipelineConfig::default();
        let sentinel = admit();
        let results = [
            anc(0, sentinel - TimeDelta::days(2), 0.3),
            anc(1, sentinel - TimeDelta::days(2) + TimeDelta::hours(3), 0.1),
            anc(2, sentinel + TimeDelta::days(1), 0.4),
            anc(3, sentinel + TimeDelta::days(2), 2.5),
            anc(4, sentinel + TimeDelta::days(5), 0.1),
        ];
        let refs: Vec<&LabResult> = results.iter().collect();

        assert_eq!(low_anc_days(&refs, sentinel, &config), 2);
    }

    #[test]
    fn test_low_anc_ignores_missing_values() {
        let config = PipelineConfig::default();
        let mut missing = anc(0, admit(), 0.0);
        missing.value = None;
        let refs = vec![&missing];

        assert_eq!(low_anc_days(&refs, admit(), &config), 0);
    }

    #[test]
    fn test_windows_at_calendar_edge_meet_no_criterion() {
        let config = PipelineConfig::default();
        let edge = NaiveDateTime::MAX - TimeDelta::hours(1);
        let late = ProcedureInterval {
            start_time: edge,
            end_time: edge,
            ..device(0, 0, 1)
        };
        let refs = vec![&late];
        let surgeries = [SurgicalProcedureRecord {
            key: EncounterKey::new(1, 1),
            icd_code: "0DTJ4ZZ".to_string(),
            estimated_time: edge,
        }];
        let low = anc(1, edge, 0.1);

        assert_eq!(invasive_near(&refs, edge, &config), None);
        assert_eq!(surgery_within(&surgeries, edge, &config), None);
        assert_eq!(low_anc_days(&[&low], edge, &config), 0);
        assert!(device_at(&refs, edge));
    }
}
