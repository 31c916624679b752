//! Loading input tables from Parquet and writing the cohort

mod utils;

use sab_cohort::algorithm::sab::run_from_tables;
use sab_cohort::config::{InputPaths, PipelineConfig};
use sab_cohort::output::{CohortRow, OutputFormat, cohort_rows, write_cohort};
use sab_cohort::tables::{ClinicalTables, InputTable};
use sab_cohort::utils::io::read_parquet;
use sab_cohort::validation::{RejectionReason, ValidationReport};
use sab_cohort::CohortError;

use chrono::NaiveDateTime;
use utils::{
    DEVICE_ITEM, SBP_ITEM, admit, batch, floats, hours, ints, string_batch, strings,
    test_parallel, timestamps, write_table,
};

const SAB: &str = "STAPH AUREUS COAG +";

fn write_inputs(dir: &std::path::Path) {
    write_table(
        dir,
        "admissions",
        &string_batch(&[
            ("subject_id", vec![Some("1"), Some("2"), Some("3")]),
            ("hadm_id", vec![Some("10"), Some("20"), Some("30")]),
            (
                "admittime",
                vec![
                    Some("2150-04-12 08:00:00"),
                    Some("2150-04-12 08:00:00"),
                    Some("2150-04-12 08:00:00"),
                ],
            ),
            (
                "dischtime",
                vec![
                    Some("2150-04-22 08:00:00"),
                    Some("2150-04-22 08:00:00"),
                    Some("2150-04-10 08:00:00"),
                ],
            ),
        ]),
    );

    let micro = dir.join("microbiologyevents");
    std::fs::create_dir(&micro).unwrap();
    write_table(
        &micro,
        "part-0",
        &string_batch(&[
            ("subject_id", vec![Some("1"), Some("2"), Some("1")]),
            ("hadm_id", vec![Some("10"), Some("20"), None]),
            (
                "charttime",
                vec![
                    Some("2150-04-15 08:00:00"),
                    Some("2150-04-12 20:00:00"),
                    Some("2150-04-12 09:00:00"),
                ],
            ),
            (
                "specimen_type_description",
                vec![Some("BLOOD CULTURE"), Some("BLOOD CULTURE"), Some("BLOOD CULTURE")],
            ),
            ("organism_name", vec![Some(SAB), Some(SAB), Some(SAB)]),
        ]),
    );
    write_table(
        &micro,
        "part-1",
        &string_batch(&[
            ("subject_id", vec![Some("1")]),
            ("hadm_id", vec![Some("10")]),
            ("charttime", vec![Some("2150-04-15 08:00:00")]),
            ("specimen_type_description", vec![Some("BLOOD CULTURE")]),
            ("organism_name", vec![Some("MRSA STAPH AUREUS")]),
        ]),
    );

    write_table(
        dir,
        "procedureevents",
        &batch(vec![
            ("subject_id", ints(&[Some(2), Some(2)])),
            ("hadm_id", ints(&[Some(20), Some(20)])),
            ("itemid", ints(&[Some(DEVICE_ITEM), Some(DEVICE_ITEM)])),
            (
                "starttime",
                strings(&[Some("2150-04-12 10:00:00"), Some("2150-04-13 10:00:00")]),
            ),
            (
                "endtime",
                strings(&[Some("2150-04-13 04:00:00"), Some("2150-04-12 10:00:00")]),
            ),
        ]),
    );
    write_table(
        dir,
        "procedure_dictionary",
        &batch(vec![
            ("itemid", ints(&[Some(DEVICE_ITEM)])),
            ("order_category_name", strings(&[Some("Invasive Lines")])),
        ]),
    );

    write_table(
        dir,
        "chartevents",
        &batch(vec![
            ("subject_id", ints(&[Some(1), Some(1), Some(1), Some(2), Some(2)])),
            ("hadm_id", ints(&[Some(10), Some(10), Some(10), Some(20), Some(20)])),
            ("itemid", ints(&[Some(SBP_ITEM); 5])),
            (
                "charttime",
                strings(&[
                    Some("2150-04-15 07:50:00"),
                    Some("2150-04-15 08:30:00"),
                    Some("2150-04-15 09:10:00"),
                    Some("2150-04-12 19:00:00"),
                    Some("2150-04-12 21:30:00"),
                ]),
            ),
            (
                "value",
                strings(&[Some("82"), Some("n/a"), Some("114"), Some("76"), Some("108")]),
            ),
        ]),
    );
    write_table(
        dir,
        "vitals_dictionary",
        &batch(vec![
            ("itemid", ints(&[Some(SBP_ITEM)])),
            ("label", strings(&[Some("Non Invasive Blood Pressure systolic")])),
        ]),
    );
    write_table(
        dir,
        "diagnoses_icd",
        &batch(vec![
            ("subject_id", ints(&[Some(1)])),
            ("hadm_id", ints(&[Some(10)])),
            ("icd_code", strings(&[Some("A4102")])),
            ("icd_version", floats(&[Some(10.0)])),
        ]),
    );
}

#[test]
fn test_load_tables_validates_records() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());

    let mut report = ValidationReport::new();
    let tables =
        ClinicalTables::load(&InputPaths::new(dir.path()), &test_parallel(), &mut report).unwrap();

    assert_eq!(tables.encounters.len(), 2);
    assert_eq!(
        report.rejected(InputTable::Admissions, RejectionReason::NegativeDuration),
        1
    );
    assert_eq!(tables.infection_events.len(), 3);
    assert_eq!(
        report.rejected(InputTable::MicrobiologyEvents, RejectionReason::MissingIdentifier),
        1
    );
    assert_eq!(tables.procedure_intervals.len(), 1);
    assert_eq!(
        report.rejected(InputTable::ProcedureEvents, RejectionReason::NegativeDuration),
        1
    );
    assert_eq!(tables.vital_readings.len(), 5);
    assert_eq!(tables.vital_readings[1].value, None);
    assert!(tables.lab_results.is_empty());
}

#[test]
fn test_record_ids_follow_file_order() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());

    let mut report = ValidationReport::new();
    let tables =
        ClinicalTables::load(&InputPaths::new(dir.path()), &test_parallel(), &mut report).unwrap();

    let last = tables.infection_events.last().unwrap();
    assert_eq!(last.record_id, 3);
    assert_eq!(last.organism.as_deref(), Some("MRSA STAPH AUREUS"));

    let result =
        run_from_tables(&tables, &PipelineConfig::default(), &test_parallel(), &mut report)
            .unwrap();
    let sentinel = result
        .episodes()
        .into_iter()
        .find(|episode| episode.key.hadm_id == 10)
        .unwrap()
        .sentinel_record_id;
    assert_eq!(sentinel, 0);
}

#[test]
fn test_extreme_timestamps_reject_only_their_records() {
    let dir = tempfile::tempdir().unwrap();
    let extreme = NaiveDateTime::MIN + hours(1);
    write_table(
        dir.path(),
        "admissions",
        &batch(vec![
            ("subject_id", ints(&[Some(1), Some(5)])),
            ("hadm_id", ints(&[Some(10), Some(50)])),
            ("admittime", timestamps(&[admit(), extreme])),
            ("dischtime", timestamps(&[admit() + hours(240), admit()])),
        ]),
    );
    write_table(
        dir.path(),
        "microbiologyevents",
        &batch(vec![
            ("subject_id", ints(&[Some(1), Some(1), Some(5)])),
            ("hadm_id", ints(&[Some(10), Some(10), Some(50)])),
            ("charttime", timestamps(&[extreme, admit() + hours(2), extreme])),
            ("specimen_type_description", strings(&[Some("BLOOD CULTURE"); 3])),
            ("organism_name", strings(&[Some(SAB); 3])),
        ]),
    );

    let mut report = ValidationReport::new();
    let tables =
        ClinicalTables::load(&InputPaths::new(dir.path()), &test_parallel(), &mut report).unwrap();
    let result =
        run_from_tables(&tables, &PipelineConfig::default(), &test_parallel(), &mut report)
            .unwrap();

    assert_eq!(
        report.rejected(InputTable::Admissions, RejectionReason::TimestampOutOfRange),
        1
    );
    assert_eq!(
        report.rejected(InputTable::MicrobiologyEvents, RejectionReason::TimestampOutOfRange),
        2
    );
    assert_eq!(result.encounter_count, 1);

    let rows = cohort_rows(&result.records);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].hadm_id, 10);
    assert_eq!(rows[0].sab_time, "2150-04-12 10:00:00");
    assert_eq!(rows[0].acquisition_type, "Community-Acquired");
}

#[test]
fn test_missing_required_table_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut report = ValidationReport::new();

    let result = ClinicalTables::load(&InputPaths::new(dir.path()), &test_parallel(), &mut report);

    assert!(matches!(result, Err(CohortError::PathIo { .. })));
}

#[test]
fn test_cohort_written_as_parquet_and_csv() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());

    let mut report = ValidationReport::new();
    let tables =
        ClinicalTables::load(&InputPaths::new(dir.path()), &test_parallel(), &mut report).unwrap();
    let result =
        run_from_tables(&tables, &PipelineConfig::default(), &test_parallel(), &mut report)
            .unwrap();

    let rows = cohort_rows(&result.records);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].acquisition_type, "Hospital-Acquired");
    assert_eq!(rows[0].hypotension_duration_minutes, Some(80));
    assert!(rows[0].has_relevant_diagnosis_code);
    assert_eq!(rows[1].presence_of_device, "Yes");
    assert_eq!(
        rows[1].invasive_procedure_time.as_deref(),
        Some("2150-04-12 10:00:00")
    );
    assert_eq!(rows[1].hypotension_duration_minutes, Some(150));

    let parquet_path = dir.path().join("cohort.parquet");
    write_cohort(&result.records, &parquet_path, OutputFormat::Parquet).unwrap();
    let batches = read_parquet(&parquet_path, 1024).unwrap();
    let read_back: Vec<CohortRow> = batches
        .iter()
        .flat_map(|batch| CohortRow::from_record_batch(batch).unwrap())
        .collect();
    assert_eq!(read_back, rows);

    let csv_path = dir.path().join("cohort.csv");
    write_cohort(&result.records, &csv_path, OutputFormat::Csv).unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("subject_id,hadm_id,sab_time,"));
    assert_eq!(lines.count(), 2);
}
