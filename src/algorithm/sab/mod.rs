//! Staphylococcus aureus bacteremia cohort derivation
//!
//! Each encounter is processed on its own: the sentinel culture is detected,
//! the episode is classified as hospital- or community-acquired, annotated
//! with the diagnosis-code label and, when hospital-acquired, linked to a
//! sustained hypotension interval.

pub mod acquisition;
pub mod concordance;
pub mod detection;
pub mod hypotension;
pub mod linkage;
pub mod pipeline;
pub mod statistics;

pub use acquisition::{CriteriaOutcome, classify, evaluate_criteria};
pub use concordance::ConcordanceSummary;
pub use detection::{DetectedEpisode, detect_episode, select_sentinel};
pub use hypotension::build_intervals;
pub use linkage::link_hypotension;
pub use pipeline::{CohortResult, EncounterOutcome, process_encounter, run, run_from_tables};
pub use statistics::{CohortStatistics, generate_summary};
