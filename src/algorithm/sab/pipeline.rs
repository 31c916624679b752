//! Cohort pipeline
//!
//! Runs detection, classification, annotation and linkage for every
//! encounter independently on a rayon pool, then assembles the cohort in
//! encounter order.

use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use std::time::Instant;

use super::acquisition::classify;
use super::concordance::{ConcordanceSummary, annotate};
use super::detection::detect_episode;
use super::hypotension::build_intervals;
use super::linkage::link_hypotension;
use crate::collections::{EncounterEvents, EncounterIndex};
use crate::config::{ParallelConfig, PipelineConfig};
use crate::error::{CohortError, Result};
use crate::lookup::CriterionLookups;
use crate::models::{AcquisitionType, ClassifiedCohortRecord, SabEpisode};
use crate::tables::ClinicalTables;
use crate::utils::logging::{create_main_progress_bar, finish_progress_bar, log_operation_complete};
use crate::validation::ValidationReport;

/// What one encounter contributes to the cohort
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncounterOutcome {
    /// Emitted as a cohort row
    Included(ClassifiedCohortRecord),
    /// Hospital-acquired episode with no linked hypotension
    Dropped(SabEpisode),
}

/// Output of a pipeline run
#[derive(Debug, Clone, Default)]
pub struct CohortResult {
    /// Cohort rows, ordered by (subject, admission, sentinel time)
    pub records: Vec<ClassifiedCohortRecord>,
    /// Hospital-acquired episodes dropped for lack of linked hypotension
    pub dropped: Vec<SabEpisode>,
    /// Episode presence against the diagnosis-code label
    pub concordance: ConcordanceSummary,
    /// Encounters examined
    pub encounter_count: usize,
}

impl CohortResult {
    /// Every classified episode, emitted or dropped, in encounter order
    #[must_use]
    pub fn episodes(&self) -> Vec<&SabEpisode> {
        let mut episodes: Vec<&SabEpisode> = self
            .records
            .iter()
            .map(|record| &record.episode)
            .chain(self.dropped.iter())
            .collect();
        episodes.sort_by_key(|episode| (episode.key, episode.sentinel_time));
        episodes
    }
}

/// Classify and link one encounter.
///
/// Community-acquired episodes are emitted without hypotension whatever the
/// vital signs show; hospital-acquired ones only when an interval links.
#[must_use]
pub fn process_encounter(
    events: &EncounterEvents<'_>,
    config: &PipelineConfig,
) -> Option<EncounterOutcome> {
    let detected = detect_episode(events, config)?;
    let mut episode = classify(&detected, events, config);
    annotate(&mut episode, events);

    if episode.acquisition_type() == AcquisitionType::CommunityAcquired {
        return Some(EncounterOutcome::Included(ClassifiedCohortRecord {
            episode,
            hypotension: None,
        }));
    }

    let intervals = build_intervals(events.key(), &events.sbp_readings, config);
    match link_hypotension(episode.sentinel_time, events.encounter, &intervals, config) {
        Some(interval) => Some(EncounterOutcome::Included(ClassifiedCohortRecord {
            episode,
            hypotension: Some(interval),
        })),
        None => Some(EncounterOutcome::Dropped(episode)),
    }
}

/// Run the pipeline over an encounter index
pub fn run(
    index: &EncounterIndex<'_>,
    config: &PipelineConfig,
    parallel: &ParallelConfig,
) -> Result<CohortResult> {
    let start = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallel.threads)
        .build()
        .map_err(|e| CohortError::Other(format!("Failed to build worker pool: {e}")))?;
    log::info!(
        "Classifying {} encounters on {} threads",
        index.len(),
        parallel.threads
    );

    let pb = create_main_progress_bar(
        index.len() as u64,
        Some("Classifying encounters"),
        parallel.show_progress,
    );

    let outcomes: Vec<EncounterOutcome> = pool.install(|| {
        index
            .encounters()
            .par_iter()
            .progress_with(pb.clone())
            .filter_map(|events| process_encounter(events, config))
            .collect()
    });
    finish_progress_bar(&pb, Some("Classification complete"));

    let mut result = CohortResult {
        encounter_count: index.len(),
        ..CohortResult::default()
    };
    for outcome in outcomes {
        match outcome {
            EncounterOutcome::Included(record) => result.records.push(record),
            EncounterOutcome::Dropped(episode) => result.dropped.push(episode),
        }
    }
    result
        .records
        .sort_by_key(|record| (record.episode.key, record.episode.sentinel_time));

    result.concordance = ConcordanceSummary::tabulate(index.encounters(), result.episodes());

    if !result.dropped.is_empty() {
        log::info!(
            "{} hospital-acquired episodes had no linked hypotension and were left out",
            result.dropped.len()
        );
    }
    log_operation_complete(
        "classified",
        &format!("{} encounters", index.len()),
        result.records.len(),
        Some(start.elapsed()),
    );
    Ok(result)
}

/// Resolve lookups, index the tables and run the pipeline
pub fn run_from_tables(
    tables: &ClinicalTables,
    config: &PipelineConfig,
    parallel: &ParallelConfig,
    report: &mut ValidationReport,
) -> Result<CohortResult> {
    config.validate()?;
    let lookups = CriterionLookups::build(tables, config);
    let index = EncounterIndex::build(tables, &lookups, config, report);
    run(&index, config, parallel)
}
