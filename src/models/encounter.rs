//! Hospital encounter (admission) model

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Timestamp;

/// Identifies one hospital admission of one subject
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EncounterKey {
    /// Subject (patient) identifier
    pub subject_id: i64,
    /// Hospital admission identifier
    pub hadm_id: i64,
}

impl EncounterKey {
    /// Create a new encounter key
    #[must_use]
    pub const fn new(subject_id: i64, hadm_id: i64) -> Self {
        Self {
            subject_id,
            hadm_id,
        }
    }
}

impl fmt::Display for EncounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.subject_id, self.hadm_id)
    }
}

/// A validated admission with `discharge_time >= admission_time`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    /// Encounter identifier
    pub key: EncounterKey,
    /// Admission timestamp
    pub admission_time: Timestamp,
    /// Discharge timestamp
    pub discharge_time: Timestamp,
}

impl Encounter {
    /// Create an encounter, returning `None` when discharge precedes admission
    #[must_use]
    pub fn new(key: EncounterKey, admission_time: Timestamp, discharge_time: Timestamp) -> Option<Self> {
        (discharge_time >= admission_time).then_some(Self {
            key,
            admission_time,
            discharge_time,
        })
    }

    /// Time elapsed between admission and `time` (negative if before admission)
    #[must_use]
    pub fn offset_of(&self, time: Timestamp) -> TimeDelta {
        time - self.admission_time
    }

    /// Whether `time` falls within [admission, discharge], both ends inclusive
    #[must_use]
    pub fn contains(&self, time: Timestamp) -> bool {
        self.admission_time <= time && time <= self.discharge_time
    }

    /// Length of stay
    #[must_use]
    pub fn length_of_stay(&self) -> TimeDelta {
        self.discharge_time - self.admission_time
    }
}
