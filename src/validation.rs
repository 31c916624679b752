//! Record-level validation
//!
//! Bad records are excluded from every derived computation and counted here.
//! A single bad record never fails the run.

use std::collections::BTreeMap;
use std::fmt;

use crate::tables::InputTable;

/// Why a record was excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectionReason {
    /// Subject or admission identifier is missing
    MissingIdentifier,
    /// A required timestamp is missing or unparseable
    MissingTimestamp,
    /// A timestamp lies outside the supported calendar years
    TimestampOutOfRange,
    /// A required non-time field (item id, code, specimen) is missing
    MissingField,
    /// Interval ends before it starts
    NegativeDuration,
    /// The record refers to an admission that is absent or was rejected
    UnknownEncounter,
    /// A second admission row with an already indexed key
    DuplicateEncounter,
}

impl RejectionReason {
    /// Short description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::MissingIdentifier => "missing identifier",
            Self::MissingTimestamp => "missing or invalid timestamp",
            Self::TimestampOutOfRange => "timestamp out of supported range",
            Self::MissingField => "missing required field",
            Self::NegativeDuration => "end before start",
            Self::UnknownEncounter => "unknown or rejected encounter",
            Self::DuplicateEncounter => "duplicate admission",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Counts of rejected records per table and reason
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    rejections: BTreeMap<(InputTable, RejectionReason), usize>,
    accepted: BTreeMap<InputTable, usize>,
}

impl ValidationReport {
    /// Empty report
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one rejected record
    pub fn reject(&mut self, table: InputTable, reason: RejectionReason) {
        *self.rejections.entry((table, reason)).or_insert(0) += 1;
    }

    /// Count accepted records
    pub fn accept(&mut self, table: InputTable, count: usize) {
        *self.accepted.entry(table).or_insert(0) += count;
    }

    /// Rejections for one table and reason
    #[must_use]
    pub fn rejected(&self, table: InputTable, reason: RejectionReason) -> usize {
        self.rejections.get(&(table, reason)).copied().unwrap_or(0)
    }

    /// Rejections for one table, any reason
    #[must_use]
    pub fn rejected_in(&self, table: InputTable) -> usize {
        self.rejections
            .iter()
            .filter(|((t, _), _)| *t == table)
            .map(|(_, count)| count)
            .sum()
    }

    /// Rejections across all tables
    #[must_use]
    pub fn total_rejected(&self) -> usize {
        self.rejections.values().sum()
    }

    /// Accepted records for one table
    #[must_use]
    pub fn accepted(&self, table: InputTable) -> usize {
        self.accepted.get(&table).copied().unwrap_or(0)
    }

    /// Log every non-zero rejection count at `warn`
    pub fn log(&self) {
        if self.rejections.is_empty() {
            log::info!("All input records passed validation");
            return;
        }
        for ((table, reason), count) in &self.rejections {
            log::warn!("Rejected {count} records from {table}: {reason}");
        }
    }
}
