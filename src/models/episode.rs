//! Derived episode, hypotension and cohort record models

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use super::{EncounterKey, Timestamp};

/// One of the conditions that can elevate an early-onset episode to
/// hospital-acquired
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum SubCriterion {
    /// Device in place at the sentinel time
    Device,
    /// Surgery within the preceding window
    Surgery,
    /// Invasive device procedure started near the sentinel time
    Invasive,
    /// Low absolute neutrophil count on at least two days around the sentinel
    Neutropenia,
}

impl SubCriterion {
    /// All sub-criteria in evaluation order
    pub const ALL: [Self; 4] = [Self::Device, Self::Surgery, Self::Invasive, Self::Neutropenia];

    /// Short name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Device => "Device",
            Self::Surgery => "Surgery",
            Self::Invasive => "Invasive",
            Self::Neutropenia => "Neutropenia",
        }
    }
}

impl fmt::Display for SubCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered set of sub-criteria (at most four members, kept sorted)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubCriteria(SmallVec<[SubCriterion; 4]>);

impl SubCriteria {
    /// Empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a criterion, keeping the set sorted and unique
    pub fn insert(&mut self, criterion: SubCriterion) {
        if let Err(pos) = self.0.binary_search(&criterion) {
            self.0.insert(pos, criterion);
        }
    }

    /// Membership test
    #[must_use]
    pub fn contains(&self, criterion: SubCriterion) -> bool {
        self.0.binary_search(&criterion).is_ok()
    }

    /// Whether no criterion is present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of criteria present
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = SubCriterion> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<SubCriterion> for SubCriteria {
    fn from_iter<I: IntoIterator<Item = SubCriterion>>(iter: I) -> Self {
        let mut set = Self::new();
        for criterion in iter {
            set.insert(criterion);
        }
        set
    }
}

impl fmt::Display for SubCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(SubCriterion::name).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// Onset relative to admission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OnsetCase {
    /// Sentinel more than the late-onset cutoff after admission
    Late,
    /// Sentinel at or before the late-onset cutoff
    Early,
}

/// Binary acquisition label
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum AcquisitionType {
    /// Attributed to the care episode
    HospitalAcquired,
    /// Early onset without any qualifying sub-criterion
    CommunityAcquired,
}

impl AcquisitionType {
    /// Output label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::HospitalAcquired => "Hospital-Acquired",
            Self::CommunityAcquired => "Community-Acquired",
        }
    }
}

impl fmt::Display for AcquisitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How an episode was classified, with the evidence that decided it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Acquisition {
    /// Hospital-acquired by late onset; sub-criteria are not evaluated
    LateOnset,
    /// Hospital-acquired by early onset with at least one sub-criterion
    EarlyOnset(SubCriteria),
    /// Community-acquired: early onset, no sub-criterion
    Community,
}

impl Acquisition {
    /// Decide from the set of true sub-criteria of an early-onset episode
    #[must_use]
    pub fn from_early_criteria(criteria: SubCriteria) -> Self {
        if criteria.is_empty() {
            Self::Community
        } else {
            Self::EarlyOnset(criteria)
        }
    }

    /// Binary acquisition label
    #[must_use]
    pub const fn acquisition_type(&self) -> AcquisitionType {
        match self {
            Self::LateOnset | Self::EarlyOnset(_) => AcquisitionType::HospitalAcquired,
            Self::Community => AcquisitionType::CommunityAcquired,
        }
    }

    /// Onset case
    #[must_use]
    pub const fn onset(&self) -> OnsetCase {
        match self {
            Self::LateOnset => OnsetCase::Late,
            Self::EarlyOnset(_) | Self::Community => OnsetCase::Early,
        }
    }

    /// Sub-criteria that qualified the episode (empty for late onset and CA)
    #[must_use]
    pub fn qualifying_subcriteria(&self) -> SubCriteria {
        match self {
            Self::EarlyOnset(criteria) => criteria.clone(),
            Self::LateOnset | Self::Community => SubCriteria::new(),
        }
    }
}

/// Per-criterion details reported in the output row
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CriterionEvidence {
    /// A device interval contains the sentinel time
    pub device_present: bool,
    /// Estimated time of the qualifying surgery
    pub estimated_surgery_time: Option<Timestamp>,
    /// Start time of the qualifying invasive procedure
    pub invasive_procedure_time: Option<Timestamp>,
    /// Distinct low-ANC days, set only when the criterion is met
    pub low_anc_days: Option<u32>,
}

/// A bloodstream-infection episode anchored at its sentinel event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SabEpisode {
    /// Encounter
    pub key: EncounterKey,
    /// Time of the sentinel (earliest qualifying) event
    pub sentinel_time: Timestamp,
    /// Input position of the sentinel event
    pub sentinel_record_id: u64,
    /// Classification
    pub acquisition: Acquisition,
    /// Criterion details
    pub evidence: CriterionEvidence,
    /// Encounter carries a reference diagnosis code
    pub has_relevant_diagnosis_code: bool,
}

impl SabEpisode {
    /// Binary acquisition label
    #[must_use]
    pub const fn acquisition_type(&self) -> AcquisitionType {
        self.acquisition.acquisition_type()
    }

    /// Sub-criteria that qualified the episode
    #[must_use]
    pub fn qualifying_subcriteria(&self) -> SubCriteria {
        self.acquisition.qualifying_subcriteria()
    }
}

/// A sustained interval of low systolic pressure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HypotensionInterval {
    /// Encounter
    pub key: EncounterKey,
    /// Time of the low reading
    pub start_time: Timestamp,
    /// Time of the first later reading at or above the threshold
    pub end_time: Timestamp,
}

impl HypotensionInterval {
    /// Interval length
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end_time - self.start_time
    }

    /// Interval length in whole minutes
    #[must_use]
    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// Whether `time` lies within [start, end], both ends inclusive
    #[must_use]
    pub fn contains(&self, time: Timestamp) -> bool {
        self.start_time <= time && time <= self.end_time
    }
}

/// Final cohort row: an episode and, for linked HA episodes, its hypotension
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassifiedCohortRecord {
    /// The classified episode
    pub episode: SabEpisode,
    /// Linked hypotension interval (always `None` for CA rows)
    pub hypotension: Option<HypotensionInterval>,
}
