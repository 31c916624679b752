//! Hypotension interval construction
//!
//! A reading below the systolic threshold opens an interval that closes at
//! the earliest strictly later reading at or above the threshold. Readings
//! are swept once from the latest to the earliest, carrying the nearest
//! recovery time seen so far, so each encounter is linear in its readings.
//!
//! Low readings with no later recovery produce nothing. Readings without a
//! value are ignored.

use itertools::Itertools;

use crate::config::PipelineConfig;
use crate::models::{EncounterKey, HypotensionInterval, Timestamp, VitalReading};

/// Build the retained hypotension intervals of one encounter.
///
/// `readings` must be sorted by measurement time. The result is sorted by
/// start time with at most one interval per start time, and every interval
/// lasts at least the configured minimum.
#[must_use]
pub fn build_intervals(
    key: EncounterKey,
    readings: &[&VitalReading],
    config: &PipelineConfig,
) -> Vec<HypotensionInterval> {
    let threshold = config.sbp_threshold;
    let min_duration = config.min_hypotension_duration();

    let mut intervals = Vec::new();
    let mut recovery: Option<Timestamp> = None;

    let groups = readings
        .iter()
        .rev()
        .chunk_by(|reading| reading.measurement_time);

    for (time, group) in &groups {
        let (low, normal) = group
            .filter_map(|reading| reading.value)
            .fold((false, false), |(low, normal), value| {
                (low || value < threshold, normal || value >= threshold)
            });

        if low {
            if let Some(end_time) = recovery {
                let interval = HypotensionInterval {
                    key,
                    start_time: time,
                    end_time,
                };
                if interval.duration() >= min_duration {
                    intervals.push(interval);
                }
            }
        }
        if normal {
            recovery = Some(time);
        }
    }

    intervals.reverse();
    intervals
}
