//! Episode detection
//!
//! Finds the sentinel (earliest qualifying blood culture) of each encounter
//! and splits episodes into late and early onset relative to admission.
//!
//! Simultaneous sentinel candidates are resolved by the lowest record id,
//! so every encounter yields at most one sentinel.

use chrono::TimeDelta;
use std::collections::BTreeMap;

use crate::collections::EncounterEvents;
use crate::config::PipelineConfig;
use crate::models::{EncounterKey, InfectionEvidenceEvent, OnsetCase, Timestamp};

/// An encounter's sentinel event and its onset case
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedEpisode<'a> {
    /// Encounter
    pub key: EncounterKey,
    /// The sentinel event
    pub sentinel: &'a InfectionEvidenceEvent,
    /// Sentinel time minus admission time
    pub offset: TimeDelta,
    /// Late or early onset
    pub onset: OnsetCase,
}

impl DetectedEpisode<'_> {
    /// Sentinel time
    #[must_use]
    pub fn sentinel_time(&self) -> Timestamp {
        self.sentinel.event_time
    }
}

/// Lazily filter events down to qualifying infection evidence
pub fn qualifying_events<'a, I>(
    events: I,
    config: &PipelineConfig,
) -> impl Iterator<Item = &'a InfectionEvidenceEvent>
where
    I: IntoIterator<Item = &'a InfectionEvidenceEvent>,
{
    events
        .into_iter()
        .filter(move |event| event.is_qualifying(&config.specimen_token, &config.organism_tokens))
}

/// Select the sentinel: minimum `(event_time, record_id)` among qualifying events
pub fn select_sentinel<'a, I>(events: I, config: &PipelineConfig) -> Option<&'a InfectionEvidenceEvent>
where
    I: IntoIterator<Item = &'a InfectionEvidenceEvent>,
{
    qualifying_events(events, config).min_by_key(|event| (event.event_time, event.record_id))
}

/// Onset case for a sentinel offset; the cutoff itself is early onset
#[must_use]
pub fn classify_onset(offset: TimeDelta, config: &PipelineConfig) -> OnsetCase {
    if offset > config.late_onset_cutoff() {
        OnsetCase::Late
    } else {
        OnsetCase::Early
    }
}

/// Detect the episode of one encounter, if it has any qualifying evidence
pub fn detect_episode<'a>(
    events: &EncounterEvents<'a>,
    config: &PipelineConfig,
) -> Option<DetectedEpisode<'a>> {
    let sentinel = select_sentinel(events.infection_events.iter().copied(), config)?;
    let offset = events.encounter.offset_of(sentinel.event_time);
    Some(DetectedEpisode {
        key: events.key(),
        sentinel,
        offset,
        onset: classify_onset(offset, config),
    })
}

/// Sentinels of a whole, ungrouped event stream, keyed by encounter
pub fn sentinels_by_encounter<'a>(
    events: &'a [InfectionEvidenceEvent],
    config: &PipelineConfig,
) -> BTreeMap<EncounterKey, &'a InfectionEvidenceEvent> {
    let mut sentinels: BTreeMap<EncounterKey, &'a InfectionEvidenceEvent> = BTreeMap::new();
    for event in qualifying_events(events, config) {
        sentinels
            .entry(event.key)
            .and_modify(|current| {
                if (event.event_time, event.record_id) < (current.event_time, current.record_id) {
                    *current = event;
                }
            })
            .or_insert(event);
    }
    sentinels
}
