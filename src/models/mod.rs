//! Domain models for the bloodstream-infection cohort
//!
//! Input records mirror the clinical event streams one-to-one. Derived
//! entities (episodes, hypotension intervals, cohort records) are built by
//! the algorithms in [`crate::algorithm::sab`] and never mutated afterwards.

pub mod dictionary;
pub mod encounter;
pub mod episode;
pub mod events;

pub use dictionary::{LabItem, ProcedureCodeTitle, ProcedureItem, VitalItem};
pub use encounter::{Encounter, EncounterKey};
pub use episode::{
    Acquisition, AcquisitionType, ClassifiedCohortRecord, CriterionEvidence, HypotensionInterval,
    OnsetCase, SabEpisode, SubCriteria, SubCriterion,
};
pub use events::{
    DiagnosisCodeRecord, InfectionEvidenceEvent, LabResult, ProcedureCodeRecord,
    ProcedureInterval, SurgicalProcedureRecord, VitalReading,
};

/// Timestamp type used for every clinical event
pub type Timestamp = chrono::NaiveDateTime;

/// Calendar years a record timestamp may fall in.
///
/// Configured windows are capped at ten years, so window arithmetic on a
/// time in this range cannot leave chrono's representable range.
pub const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 1000..=9999;

/// Whether `time` lies in [`SUPPORTED_YEARS`]
#[must_use]
pub fn is_supported_time(time: Timestamp) -> bool {
    use chrono::Datelike;
    SUPPORTED_YEARS.contains(&time.year())
}
