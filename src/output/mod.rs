//! Cohort export
//!
//! Flattens [`ClassifiedCohortRecord`]s into output rows and writes them as
//! Parquet or CSV through an Arrow record batch.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::{CohortError, Result};
use crate::models::{ClassifiedCohortRecord, Timestamp};
use crate::utils::io::{write_csv, write_parquet};

/// Timestamp format of every output time column
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One output row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortRow {
    pub subject_id: i64,
    pub hadm_id: i64,
    pub sab_time: String,
    pub hypotension_start: Option<String>,
    pub hypotension_recover: Option<String>,
    pub hypotension_duration_minutes: Option<i64>,
    /// "Yes" or "No"
    pub presence_of_device: String,
    pub estimated_surgery_time: Option<String>,
    pub invasive_procedure_time: Option<String>,
    pub low_anc_days: Option<u32>,
    pub has_relevant_diagnosis_code: bool,
    /// "Hospital-Acquired" or "Community-Acquired"
    pub acquisition_type: String,
}

fn format_time(time: Timestamp) -> String {
    time.format(TIME_FORMAT).to_string()
}

impl From<&ClassifiedCohortRecord> for CohortRow {
    fn from(record: &ClassifiedCohortRecord) -> Self {
        let episode = &record.episode;
        let evidence = &episode.evidence;
        Self {
            subject_id: episode.key.subject_id,
            hadm_id: episode.key.hadm_id,
            sab_time: format_time(episode.sentinel_time),
            hypotension_start: record.hypotension.map(|i| format_time(i.start_time)),
            hypotension_recover: record.hypotension.map(|i| format_time(i.end_time)),
            hypotension_duration_minutes: record.hypotension.map(|i| i.duration_minutes()),
            presence_of_device: if evidence.device_present { "Yes" } else { "No" }.to_string(),
            estimated_surgery_time: evidence.estimated_surgery_time.map(format_time),
            invasive_procedure_time: evidence.invasive_procedure_time.map(format_time),
            low_anc_days: evidence.low_anc_days,
            has_relevant_diagnosis_code: episode.has_relevant_diagnosis_code,
            acquisition_type: episode.acquisition_type().label().to_string(),
        }
    }
}

impl CohortRow {
    /// Arrow schema of the output
    #[must_use]
    pub fn schema() -> Schema {
        Schema::new(vec![
            Field::new("subject_id", DataType::Int64, false),
            Field::new("hadm_id", DataType::Int64, false),
            Field::new("sab_time", DataType::Utf8, false),
            Field::new("hypotension_start", DataType::Utf8, true),
            Field::new("hypotension_recover", DataType::Utf8, true),
            Field::new("hypotension_duration_minutes", DataType::Int64, true),
            Field::new("presence_of_device", DataType::Utf8, false),
            Field::new("estimated_surgery_time", DataType::Utf8, true),
            Field::new("invasive_procedure_time", DataType::Utf8, true),
            Field::new("low_anc_days", DataType::UInt32, true),
            Field::new("has_relevant_diagnosis_code", DataType::Boolean, false),
            Field::new("acquisition_type", DataType::Utf8, false),
        ])
    }

    /// Convert rows to a record batch
    pub fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        let fields: Vec<FieldRef> = Self::schema().fields().iter().map(Arc::clone).collect();
        Ok(serde_arrow::to_record_batch(&fields, &rows)?)
    }

    /// Read rows back from a record batch
    pub fn from_record_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        Ok(serde_arrow::from_record_batch(batch)?)
    }
}

/// Flatten cohort records into output rows
#[must_use]
pub fn cohort_rows(records: &[ClassifiedCohortRecord]) -> Vec<CohortRow> {
    records.iter().map(CohortRow::from).collect()
}

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Snappy-compressed Parquet
    #[default]
    Parquet,
    /// Comma-separated with a header row
    Csv,
}

impl FromStr for OutputFormat {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parquet" => Ok(Self::Parquet),
            "csv" => Ok(Self::Csv),
            other => Err(CohortError::invalid_config(format!(
                "Unknown output format '{other}', expected parquet or csv"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parquet => f.write_str("parquet"),
            Self::Csv => f.write_str("csv"),
        }
    }
}

/// Write the cohort to `path`
pub fn write_cohort(
    records: &[ClassifiedCohortRecord],
    path: &Path,
    format: OutputFormat,
) -> Result<()> {
    let batch = CohortRow::to_record_batch(&cohort_rows(records))?;
    match format {
        OutputFormat::Parquet => write_parquet(path, &batch),
        OutputFormat::Csv => write_csv(path, &batch),
    }
}
