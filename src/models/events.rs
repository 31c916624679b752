//! Timestamped clinical event records
//!
//! Every record carries a `record_id`: its position in the loaded input. The
//! id is stable across runs on identical input and breaks ties between
//! events sharing a timestamp.

use serde::{Deserialize, Serialize};

use super::{EncounterKey, Timestamp};

/// A microbiology result that may be evidence of a bloodstream infection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfectionEvidenceEvent {
    /// Stable input position
    pub record_id: u64,
    /// Encounter the specimen belongs to
    pub key: EncounterKey,
    /// Chart time of the specimen
    pub event_time: Timestamp,
    /// Specimen type description, e.g. "BLOOD CULTURE"
    pub specimen_type: String,
    /// Organism name, absent when nothing grew
    pub organism: Option<String>,
}

impl InfectionEvidenceEvent {
    /// Whether this record is evidence of the target infection.
    ///
    /// The specimen must contain `specimen_token` and the organism must
    /// contain every one of `organism_tokens`, all case-insensitively.
    #[must_use]
    pub fn is_qualifying(&self, specimen_token: &str, organism_tokens: &[String]) -> bool {
        let Some(organism) = self.organism.as_deref() else {
            return false;
        };
        let organism = organism.to_lowercase();
        contains_ignore_case(&self.specimen_type, specimen_token)
            && organism_tokens
                .iter()
                .all(|token| organism.contains(&token.to_lowercase()))
    }
}

/// A charted procedure with a start and end (lines, catheters, drains)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureInterval {
    /// Stable input position
    pub record_id: u64,
    /// Encounter
    pub key: EncounterKey,
    /// Procedure item identifier
    pub item_id: i64,
    /// Procedure start
    pub start_time: Timestamp,
    /// Procedure end, never before `start_time`
    pub end_time: Timestamp,
}

impl ProcedureInterval {
    /// Whether `time` lies within [start, end], both ends inclusive
    #[must_use]
    pub fn contains(&self, time: Timestamp) -> bool {
        self.start_time <= time && time <= self.end_time
    }
}

/// A coded (ICD) procedure billed for an encounter, as loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureCodeRecord {
    /// Stable input position
    pub record_id: u64,
    /// Encounter
    pub key: EncounterKey,
    /// ICD procedure code
    pub icd_code: String,
}

/// A surgical procedure with an estimated time.
///
/// Coded procedures carry no timestamp, so the time is estimated as one day
/// after admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurgicalProcedureRecord {
    /// Encounter
    pub key: EncounterKey,
    /// ICD procedure code
    pub icd_code: String,
    /// Estimated time of surgery
    pub estimated_time: Timestamp,
}

/// A laboratory result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabResult {
    /// Stable input position
    pub record_id: u64,
    /// Encounter
    pub key: EncounterKey,
    /// Lab item identifier
    pub item_id: i64,
    /// Sample chart time
    pub sample_time: Timestamp,
    /// Numeric value; `None` when missing or non-numeric
    pub value: Option<f64>,
}

/// A charted vital sign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalReading {
    /// Stable input position
    pub record_id: u64,
    /// Encounter
    pub key: EncounterKey,
    /// Chart item identifier
    pub item_id: i64,
    /// Measurement chart time
    pub measurement_time: Timestamp,
    /// Numeric value; `None` when missing or non-numeric
    pub value: Option<f64>,
}

/// A diagnosis code billed for an encounter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisCodeRecord {
    /// Encounter
    pub key: EncounterKey,
    /// ICD diagnosis code
    pub icd_code: String,
    /// ICD version (9 or 10)
    pub icd_version: Option<i64>,
}

/// Case-insensitive substring test
#[must_use]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
