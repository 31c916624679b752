//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use sab_cohort::config::ParallelConfig;
use sab_cohort::models::{
    DiagnosisCodeRecord, Encounter, EncounterKey, InfectionEvidenceEvent, LabItem, LabResult,
    ProcedureCodeRecord, ProcedureCodeTitle, ProcedureInterval, ProcedureItem, VitalItem,
    VitalReading,
};
use sab_cohort::tables::ClinicalTables;
use sab_cohort::utils::io::write_parquet;

/// Central line item, category "Invasive Lines"
pub const DEVICE_ITEM: i64 = 224263;
/// Imaging item, not a device
pub const IMAGING_ITEM: i64 = 225459;
/// Absolute neutrophil count
pub const ANC_ITEM: i64 = 52075;
/// Non-invasive systolic blood pressure
pub const SBP_ITEM: i64 = 220179;
/// Diastolic blood pressure, never used for hypotension
pub const DBP_ITEM: i64 = 220180;
/// Open appendectomy
pub const SURGICAL_CODE: &str = "0DTJ0ZZ";

/// Fixed admission time used by the scenarios
#[must_use]
pub fn admit() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2150, 4, 12)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

#[must_use]
pub fn hours(h: i64) -> TimeDelta {
    TimeDelta::hours(h)
}

#[must_use]
pub fn minutes(m: i64) -> TimeDelta {
    TimeDelta::minutes(m)
}

/// Two workers, no progress bars
#[must_use]
pub fn test_parallel() -> ParallelConfig {
    ParallelConfig::default().with_threads(2).with_progress(false)
}

/// In-memory builder for [`ClinicalTables`] with the dictionaries filled in
pub struct TablesBuilder {
    tables: ClinicalTables,
    next_id: u64,
}

impl Default for TablesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TablesBuilder {
    #[must_use]
    pub fn new() -> Self {
        let tables = ClinicalTables {
            procedure_items: vec![
                ProcedureItem {
                    item_id: DEVICE_ITEM,
                    order_category_name: Some("Invasive Lines".to_string()),
                },
                ProcedureItem {
                    item_id: IMAGING_ITEM,
                    order_category_name: Some("Imaging".to_string()),
                },
            ],
            procedure_code_titles: vec![ProcedureCodeTitle {
                icd_code: SURGICAL_CODE.to_string(),
                long_title: Some("Resection of Appendix, Open Approach, Operation".to_string()),
            }],
            lab_items: vec![LabItem {
                item_id: ANC_ITEM,
                label: Some("Absolute Neutrophil Count".to_string()),
            }],
            vital_items: vec![
                VitalItem {
                    item_id: SBP_ITEM,
                    label: Some("Non Invasive Blood Pressure systolic".to_string()),
                },
                VitalItem {
                    item_id: DBP_ITEM,
                    label: Some("Non Invasive Blood Pressure diastolic".to_string()),
                },
            ],
            ..ClinicalTables::default()
        };
        Self { tables, next_id: 0 }
    }

    fn id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Admission lasting ten days from [`admit`]
    #[must_use]
    pub fn admission(mut self, key: EncounterKey) -> Self {
        self.tables
            .encounters
            .push(Encounter::new(key, admit(), admit() + TimeDelta::days(10)).unwrap());
        self
    }

    /// S. aureus blood culture
    #[must_use]
    pub fn sab_culture(self, key: EncounterKey, time: NaiveDateTime) -> Self {
        self.culture(key, time, "BLOOD CULTURE", Some("STAPH AUREUS COAG +"))
    }

    #[must_use]
    pub fn culture(
        mut self,
        key: EncounterKey,
        time: NaiveDateTime,
        specimen: &str,
        organism: Option<&str>,
    ) -> Self {
        let record_id = self.id();
        self.tables.infection_events.push(InfectionEvidenceEvent {
            record_id,
            key,
            event_time: time,
            specimen_type: specimen.to_string(),
            organism: organism.map(str::to_string),
        });
        self
    }

    #[must_use]
    pub fn procedure(
        mut self,
        key: EncounterKey,
        item_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        let record_id = self.id();
        self.tables.procedure_intervals.push(ProcedureInterval {
            record_id,
            key,
            item_id,
            start_time: start,
            end_time: end,
        });
        self
    }

    #[must_use]
    pub fn surgery(mut self, key: EncounterKey) -> Self {
        let record_id = self.id();
        self.tables.procedure_codes.push(ProcedureCodeRecord {
            record_id,
            key,
            icd_code: SURGICAL_CODE.to_string(),
        });
        self
    }

    #[must_use]
    pub fn anc(mut self, key: EncounterKey, time: NaiveDateTime, value: Option<f64>) -> Self {
        let record_id = self.id();
        self.tables.lab_results.push(LabResult {
            record_id,
            key,
            item_id: ANC_ITEM,
            sample_time: time,
            value,
        });
        self
    }

    #[must_use]
    pub fn vital(mut self, key: EncounterKey, item_id: i64, time: NaiveDateTime, value: f64) -> Self {
        let record_id = self.id();
        self.tables.vital_readings.push(VitalReading {
            record_id,
            key,
            item_id,
            measurement_time: time,
            value: Some(value),
        });
        self
    }

    #[must_use]
    pub fn sbp(self, key: EncounterKey, time: NaiveDateTime, value: f64) -> Self {
        self.vital(key, SBP_ITEM, time, value)
    }

    /// Sustained hypotension around `time`: low 10 minutes before, recovered
    /// 70 minutes after
    #[must_use]
    pub fn hypotension_around(self, key: EncounterKey, time: NaiveDateTime) -> Self {
        self.sbp(key, time - minutes(10), 84.0)
            .sbp(key, time + minutes(70), 112.0)
    }

    #[must_use]
    pub fn diagnosis(mut self, key: EncounterKey, code: &str) -> Self {
        self.tables.diagnosis_codes.push(DiagnosisCodeRecord {
            key,
            icd_code: code.to_string(),
            icd_version: Some(10),
        });
        self
    }

    #[must_use]
    pub fn build(self) -> ClinicalTables {
        self.tables
    }
}

fn nullable_strings(values: &[Option<&str>]) -> ArrayRef {
    Arc::new(StringArray::from(values.to_vec()))
}

/// Build a batch of nullable string columns
#[must_use]
pub fn string_batch(columns: &[(&str, Vec<Option<&str>>)]) -> RecordBatch {
    let schema = Schema::new(
        columns
            .iter()
            .map(|(name, _)| Field::new(*name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    );
    let arrays = columns
        .iter()
        .map(|(_, values)| nullable_strings(values))
        .collect();
    RecordBatch::try_new(Arc::new(schema), arrays).unwrap()
}

/// Build a batch from typed columns
#[must_use]
pub fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
    RecordBatch::try_from_iter(columns).unwrap()
}

#[must_use]
pub fn ints(values: &[Option<i64>]) -> ArrayRef {
    Arc::new(Int64Array::from(values.to_vec()))
}

#[must_use]
pub fn floats(values: &[Option<f64>]) -> ArrayRef {
    Arc::new(Float64Array::from(values.to_vec()))
}

#[must_use]
pub fn strings(values: &[Option<&str>]) -> ArrayRef {
    nullable_strings(values)
}

/// Microsecond timestamp column
#[must_use]
pub fn timestamps(values: &[NaiveDateTime]) -> ArrayRef {
    Arc::new(TimestampMicrosecondArray::from(
        values
            .iter()
            .map(|time| time.and_utc().timestamp_micros())
            .collect::<Vec<_>>(),
    ))
}

/// Write `batch` as `<dir>/<name>.parquet`
pub fn write_table(dir: &Path, name: &str, batch: &RecordBatch) {
    write_parquet(&dir.join(format!("{name}.parquet")), batch).unwrap();
}
