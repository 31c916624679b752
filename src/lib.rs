//! Derivation of a hypotension-linked Staphylococcus aureus bacteremia
//! cohort from clinical event tables.
//!
//! Episodes are detected per admission, classified as hospital- or
//! community-acquired, linked to sustained hypotension and compared against
//! a diagnosis-code label.

pub mod algorithm;
pub mod collections;
pub mod config;
pub mod error;
pub mod lookup;
pub mod models;
pub mod output;
pub mod tables;
pub mod utils;
pub mod validation;

// Re-export the most common types for easier use
pub use algorithm::sab::{CohortResult, CohortStatistics, ConcordanceSummary, run, run_from_tables};
pub use collections::{EncounterEvents, EncounterIndex};
pub use config::{InputPaths, ParallelConfig, PipelineConfig};
pub use error::{CohortError, Result};
pub use lookup::CriterionLookups;
pub use models::{
    Acquisition, AcquisitionType, ClassifiedCohortRecord, Encounter, EncounterKey,
    HypotensionInterval, SabEpisode, SubCriteria, SubCriterion,
};
pub use output::{CohortRow, OutputFormat, write_cohort};
pub use tables::{ClinicalTables, InputTable};
pub use validation::ValidationReport;
