//! Record batch deserializers for the input tables
//!
//! Each function turns the batches of one table into typed records. Rows
//! with missing keys, missing or out-of-range timestamps, and intervals that
//! end before they start, are rejected into the [`ValidationReport`]. Record ids count rows
//! across all batches of a table, in load order.

use arrow::record_batch::RecordBatch;

use crate::error::Result;
use crate::models::{
    DiagnosisCodeRecord, Encounter, EncounterKey, InfectionEvidenceEvent, LabItem, LabResult,
    ProcedureCodeRecord, ProcedureCodeTitle, ProcedureInterval, ProcedureItem, Timestamp,
    VitalItem, VitalReading, is_supported_time,
};
use crate::tables::InputTable;
use crate::utils::arrow::{float64_column, int64_column, string_column, timestamp_column};
use crate::validation::{RejectionReason, ValidationReport};

/// Column names of the input contract
pub mod columns {
    /// Subject identifier
    pub const SUBJECT_ID: &str = "subject_id";
    /// Admission identifier
    pub const HADM_ID: &str = "hadm_id";
    /// Admission time
    pub const ADMITTIME: &str = "admittime";
    /// Discharge time
    pub const DISCHTIME: &str = "dischtime";
    /// Chart time of an event
    pub const CHARTTIME: &str = "charttime";
    /// Microbiology specimen description
    pub const SPECIMEN_TYPE: &str = "specimen_type_description";
    /// Microbiology organism
    pub const ORGANISM: &str = "organism_name";
    /// Item identifier
    pub const ITEMID: &str = "itemid";
    /// Procedure start
    pub const STARTTIME: &str = "starttime";
    /// Procedure end
    pub const ENDTIME: &str = "endtime";
    /// Procedure order category
    pub const ORDER_CATEGORY: &str = "order_category_name";
    /// ICD code
    pub const ICD_CODE: &str = "icd_code";
    /// ICD version
    pub const ICD_VERSION: &str = "icd_version";
    /// ICD long title
    pub const LONG_TITLE: &str = "long_title";
    /// Dictionary label
    pub const LABEL: &str = "label";
    /// Measured value
    pub const VALUE: &str = "value";
}

use columns::*;

fn encounter_keys(
    batch: &RecordBatch,
    table: InputTable,
) -> Result<Vec<Option<EncounterKey>>> {
    let subjects = int64_column(batch, table.name(), SUBJECT_ID, true)?;
    let admissions = int64_column(batch, table.name(), HADM_ID, true)?;
    Ok(subjects
        .into_iter()
        .zip(admissions)
        .map(|(subject, hadm)| Some(EncounterKey::new(subject?, hadm?)))
        .collect())
}

fn checked_time(time: Option<Timestamp>) -> std::result::Result<Timestamp, RejectionReason> {
    match time {
        None => Err(RejectionReason::MissingTimestamp),
        Some(time) if !is_supported_time(time) => Err(RejectionReason::TimestampOutOfRange),
        Some(time) => Ok(time),
    }
}

/// Deserialize admissions into validated encounters
pub fn admissions(batches: &[RecordBatch], report: &mut ValidationReport) -> Result<Vec<Encounter>> {
    let table = InputTable::Admissions;
    let mut encounters = Vec::new();

    for batch in batches {
        let keys = encounter_keys(batch, table)?;
        let admit = timestamp_column(batch, table.name(), ADMITTIME, true)?;
        let disch = timestamp_column(batch, table.name(), DISCHTIME, true)?;

        for row in 0..batch.num_rows() {
            let Some(key) = keys[row] else {
                report.reject(table, RejectionReason::MissingIdentifier);
                continue;
            };
            let (admission_time, discharge_time) =
                match (checked_time(admit[row]), checked_time(disch[row])) {
                    (Ok(admission_time), Ok(discharge_time)) => (admission_time, discharge_time),
                    (Err(reason), _) | (_, Err(reason)) => {
                        report.reject(table, reason);
                        continue;
                    }
                };
            match Encounter::new(key, admission_time, discharge_time) {
                Some(encounter) => encounters.push(encounter),
                None => report.reject(table, RejectionReason::NegativeDuration),
            }
        }
    }

    report.accept(table, encounters.len());
    Ok(encounters)
}

/// Deserialize microbiology results
pub fn microbiology_events(
    batches: &[RecordBatch],
    report: &mut ValidationReport,
) -> Result<Vec<InfectionEvidenceEvent>> {
    let table = InputTable::MicrobiologyEvents;
    let mut events = Vec::new();
    let mut record_id = 0u64;

    for batch in batches {
        let keys = encounter_keys(batch, table)?;
        let times = timestamp_column(batch, table.name(), CHARTTIME, true)?;
        let specimens = string_column(batch, table.name(), SPECIMEN_TYPE, true)?;
        let organisms = string_column(batch, table.name(), ORGANISM, true)?;

        for (row, specimen) in specimens.into_iter().enumerate() {
            let id = record_id;
            record_id += 1;
            let Some(key) = keys[row] else {
                report.reject(table, RejectionReason::MissingIdentifier);
                continue;
            };
            let event_time = match checked_time(times[row]) {
                Ok(time) => time,
                Err(reason) => {
                    report.reject(table, reason);
                    continue;
                }
            };
            let Some(specimen_type) = specimen else {
                report.reject(table, RejectionReason::MissingField);
                continue;
            };
            events.push(InfectionEvidenceEvent {
                record_id: id,
                key,
                event_time,
                specimen_type,
                organism: organisms[row].clone(),
            });
        }
    }

    report.accept(table, events.len());
    Ok(events)
}

/// Deserialize charted procedures
pub fn procedure_events(
    batches: &[RecordBatch],
    report: &mut ValidationReport,
) -> Result<Vec<ProcedureInterval>> {
    let table = InputTable::ProcedureEvents;
    let mut intervals = Vec::new();
    let mut record_id = 0u64;

    for batch in batches {
        let keys = encounter_keys(batch, table)?;
        let items = int64_column(batch, table.name(), ITEMID, true)?;
        let starts = timestamp_column(batch, table.name(), STARTTIME, true)?;
        let ends = timestamp_column(batch, table.name(), ENDTIME, true)?;

        for row in 0..batch.num_rows() {
            let id = record_id;
            record_id += 1;
            let Some(key) = keys[row] else {
                report.reject(table, RejectionReason::MissingIdentifier);
                continue;
            };
            let Some(item_id) = items[row] else {
                report.reject(table, RejectionReason::MissingField);
                continue;
            };
            let (start_time, end_time) =
                match (checked_time(starts[row]), checked_time(ends[row])) {
                    (Ok(start_time), Ok(end_time)) => (start_time, end_time),
                    (Err(reason), _) | (_, Err(reason)) => {
                        report.reject(table, reason);
                        continue;
                    }
                };
            if end_time < start_time {
                report.reject(table, RejectionReason::NegativeDuration);
                continue;
            }
            intervals.push(ProcedureInterval {
                record_id: id,
                key,
                item_id,
                start_time,
                end_time,
            });
        }
    }

    report.accept(table, intervals.len());
    Ok(intervals)
}

/// Deserialize coded procedures
pub fn procedure_codes(
    batches: &[RecordBatch],
    report: &mut ValidationReport,
) -> Result<Vec<ProcedureCodeRecord>> {
    let table = InputTable::DiagnosisProcedures;
    let mut records = Vec::new();
    let mut record_id = 0u64;

    for batch in batches {
        let keys = encounter_keys(batch, table)?;
        let codes = string_column(batch, table.name(), ICD_CODE, true)?;

        for (row, code) in codes.into_iter().enumerate() {
            let id = record_id;
            record_id += 1;
            let Some(key) = keys[row] else {
                report.reject(table, RejectionReason::MissingIdentifier);
                continue;
            };
            let Some(icd_code) = code else {
                report.reject(table, RejectionReason::MissingField);
                continue;
            };
            records.push(ProcedureCodeRecord {
                record_id: id,
                key,
                icd_code,
            });
        }
    }

    report.accept(table, records.len());
    Ok(records)
}

/// Deserialize lab results; non-numeric values load as `None`
pub fn lab_events(batches: &[RecordBatch], report: &mut ValidationReport) -> Result<Vec<LabResult>> {
    let table = InputTable::LabEvents;
    let mut results = Vec::new();
    let mut record_id = 0u64;

    for batch in batches {
        let keys = encounter_keys(batch, table)?;
        let items = int64_column(batch, table.name(), ITEMID, true)?;
        let times = timestamp_column(batch, table.name(), CHARTTIME, true)?;
        let values = float64_column(batch, table.name(), VALUE, true)?;

        for row in 0..batch.num_rows() {
            let id = record_id;
            record_id += 1;
            let Some(key) = keys[row] else {
                report.reject(table, RejectionReason::MissingIdentifier);
                continue;
            };
            let Some(item_id) = items[row] else {
                report.reject(table, RejectionReason::MissingField);
                continue;
            };
            let sample_time = match checked_time(times[row]) {
                Ok(time) => time,
                Err(reason) => {
                    report.reject(table, reason);
                    continue;
                }
            };
            results.push(LabResult {
                record_id: id,
                key,
                item_id,
                sample_time,
                value: values[row],
            });
        }
    }

    report.accept(table, results.len());
    Ok(results)
}

/// Deserialize charted vital signs; non-numeric values load as `None`
pub fn chart_events(
    batches: &[RecordBatch],
    report: &mut ValidationReport,
) -> Result<Vec<VitalReading>> {
    let table = InputTable::ChartEvents;
    let mut readings = Vec::new();
    let mut record_id = 0u64;

    for batch in batches {
        let keys = encounter_keys(batch, table)?;
        let items = int64_column(batch, table.name(), ITEMID, true)?;
        let times = timestamp_column(batch, table.name(), CHARTTIME, true)?;
        let values = float64_column(batch, table.name(), VALUE, true)?;

        for row in 0..batch.num_rows() {
            let id = record_id;
            record_id += 1;
            let Some(key) = keys[row] else {
                report.reject(table, RejectionReason::MissingIdentifier);
                continue;
            };
            let Some(item_id) = items[row] else {
                report.reject(table, RejectionReason::MissingField);
                continue;
            };
            let measurement_time = match checked_time(times[row]) {
                Ok(time) => time,
                Err(reason) => {
                    report.reject(table, reason);
                    continue;
                }
            };
            readings.push(VitalReading {
                record_id: id,
                key,
                item_id,
                measurement_time,
                value: values[row],
            });
        }
    }

    report.accept(table, readings.len());
    Ok(readings)
}

/// Deserialize coded diagnoses
pub fn diagnosis_codes(
    batches: &[RecordBatch],
    report: &mut ValidationReport,
) -> Result<Vec<DiagnosisCodeRecord>> {
    let table = InputTable::DiagnosisCodes;
    let mut records = Vec::new();

    for batch in batches {
        let keys = encounter_keys(batch, table)?;
        let codes = string_column(batch, table.name(), ICD_CODE, true)?;
        let versions = int64_column(batch, table.name(), ICD_VERSION, false)?;

        for (row, code) in codes.into_iter().enumerate() {
            let Some(key) = keys[row] else {
                report.reject(table, RejectionReason::MissingIdentifier);
                continue;
            };
            let Some(icd_code) = code else {
                report.reject(table, RejectionReason::MissingField);
                continue;
            };
            records.push(DiagnosisCodeRecord {
                key,
                icd_code,
                icd_version: versions[row],
            });
        }
    }

    report.accept(table, records.len());
    Ok(records)
}

/// Deserialize `(itemid, <label column>)` dictionary rows
fn item_dictionary<T>(
    batches: &[RecordBatch],
    table: InputTable,
    label_column: &str,
    report: &mut ValidationReport,
    build: impl Fn(i64, Option<String>) -> T,
) -> Result<Vec<T>> {
    let mut rows = Vec::new();

    for batch in batches {
        let items = int64_column(batch, table.name(), ITEMID, true)?;
        let labels = string_column(batch, table.name(), label_column, true)?;

        for (item, label) in items.into_iter().zip(labels) {
            match item {
                Some(item_id) => rows.push(build(item_id, label)),
                None => report.reject(table, RejectionReason::MissingField),
            }
        }
    }

    report.accept(table, rows.len());
    Ok(rows)
}

/// Deserialize the procedure item dictionary
pub fn procedure_items(
    batches: &[RecordBatch],
    report: &mut ValidationReport,
) -> Result<Vec<ProcedureItem>> {
    item_dictionary(
        batches,
        InputTable::ProcedureDictionary,
        ORDER_CATEGORY,
        report,
        |item_id, order_category_name| ProcedureItem {
            item_id,
            order_category_name,
        },
    )
}

/// Deserialize the lab item dictionary
pub fn lab_items(batches: &[RecordBatch], report: &mut ValidationReport) -> Result<Vec<LabItem>> {
    item_dictionary(
        batches,
        InputTable::LabDictionary,
        LABEL,
        report,
        |item_id, label| LabItem { item_id, label },
    )
}

/// Deserialize the chart item dictionary
pub fn vital_items(batches: &[RecordBatch], report: &mut ValidationReport) -> Result<Vec<VitalItem>> {
    item_dictionary(
        batches,
        InputTable::VitalsDictionary,
        LABEL,
        report,
        |item_id, label| VitalItem { item_id, label },
    )
}

/// Deserialize the ICD procedure dictionary
pub fn procedure_code_titles(
    batches: &[RecordBatch],
    report: &mut ValidationReport,
) -> Result<Vec<ProcedureCodeTitle>> {
    let table = InputTable::ProcedureCodeDictionary;
    let mut rows = Vec::new();

    for batch in batches {
        let codes = string_column(batch, table.name(), ICD_CODE, true)?;
        let titles = string_column(batch, table.name(), LONG_TITLE, true)?;

        for (code, long_title) in codes.into_iter().zip(titles) {
            match code {
                Some(icd_code) => rows.push(ProcedureCodeTitle {
                    icd_code,
                    long_title,
                }),
                None => report.reject(table, RejectionReason::MissingField),
            }
        }
    }

    report.accept(table, rows.len());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array, StringArray, TimestampMicrosecondArray};
    use arrow::datatypes::{Field, Schema};
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
    use std::sync::Arc;

    fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect();
        let arrays = columns.into_iter().map(|(_, array)| array).collect();
        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
    }

    fn micros(time: NaiveDateTime) -> i64 {
        time.and_utc().timestamp_micros()
    }

    fn admit() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2150, 4, 12)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_extreme_timestamps_are_rejected() {
        let extreme = NaiveDateTime::MIN + TimeDelta::hours(1);
        let admissions_batch = batch(vec![
            (SUBJECT_ID, Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
            (HADM_ID, Arc::new(Int64Array::from(vec![10, 20])) as ArrayRef),
            (
                ADMITTIME,
                Arc::new(TimestampMicrosecondArray::from(vec![
                    micros(extreme),
                    micros(admit()),
                ])) as ArrayRef,
            ),
            (
                DISCHTIME,
                Arc::new(TimestampMicrosecondArray::from(vec![
                    micros(admit()),
                    micros(NaiveDateTime::MAX - TimeDelta::hours(1)),
                ])) as ArrayRef,
            ),
        ]);
        let culture_batch = batch(vec![
            (SUBJECT_ID, Arc::new(Int64Array::from(vec![1, 1])) as ArrayRef),
            (HADM_ID, Arc::new(Int64Array::from(vec![10, 10])) as ArrayRef),
            (
                CHARTTIME,
                Arc::new(TimestampMicrosecondArray::from(vec![
                    micros(extreme),
                    micros(admit()),
                ])) as ArrayRef,
            ),
            (
                SPECIMEN_TYPE,
                Arc::new(StringArray::from(vec!["BLOOD CULTURE", "BLOOD CULTURE"])) as ArrayRef,
            ),
            (
                ORGANISM,
                Arc::new(StringArray::from(vec![
                    "STAPH AUREUS COAG +",
                    "STAPH AUREUS COAG +",
                ])) as ArrayRef,
            ),
        ]);

        let mut report = ValidationReport::new();
        let encounters = admissions(&[admissions_batch], &mut report).unwrap();
        let events = microbiology_events(&[culture_batch], &mut report).unwrap();

        assert!(encounters.is_empty());
        assert_eq!(
            report.rejected(InputTable::Admissions, RejectionReason::TimestampOutOfRange),
            2
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].record_id, 1);
        assert_eq!(
            report.rejected(InputTable::MicrobiologyEvents, RejectionReason::TimestampOutOfRange),
            1
        );
    }

    #[test]
    fn test_checked_time_reasons() {
        assert_eq!(checked_time(None), Err(RejectionReason::MissingTimestamp));
        assert_eq!(checked_time(Some(admit())), Ok(admit()));
        assert_eq!(
            checked_time(Some(NaiveDateTime::MAX)),
            Err(RejectionReason::TimestampOutOfRange)
        );
    }
}
