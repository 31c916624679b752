//! Episode to hypotension linkage
//!
//! An interval links to an episode when it started at or before the
//! sentinel and keeps going for at least the post-sentinel minimum after
//! it. Hypotension that begins after the sentinel never links. The sentinel
//! itself must fall within the admission.

use crate::config::PipelineConfig;
use crate::models::{Encounter, HypotensionInterval, Timestamp};

/// Whether `interval` satisfies the linkage predicate for `sentinel_time`
#[must_use]
pub fn qualifies(
    interval: &HypotensionInterval,
    sentinel_time: Timestamp,
    config: &PipelineConfig,
) -> bool {
    interval.contains(sentinel_time)
        && interval.end_time - sentinel_time >= config.min_post_sentinel_duration()
}

/// Find the interval to report for an episode.
///
/// `intervals` must be sorted by start time. Among qualifying intervals the
/// one with the earliest start wins, then the earliest end.
#[must_use]
pub fn link_hypotension(
    sentinel_time: Timestamp,
    encounter: &Encounter,
    intervals: &[HypotensionInterval],
    config: &PipelineConfig,
) -> Option<HypotensionInterval> {
    if !encounter.contains(sentinel_time) {
        return None;
    }

    let started = intervals.partition_point(|interval| interval.start_time <= sentinel_time);
    intervals[..started]
        .iter()
        .filter(|interval| qualifies(interval, sentinel_time, config))
        .min_by_key(|interval| (interval.start_time, interval.end_time))
        .copied()
}
