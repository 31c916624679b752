//! Input tables
//!
//! Loads the clinical event streams and terminology dictionaries from
//! Parquet into typed, immutable record vectors.

pub mod deserializer;

use arrow::record_batch::RecordBatch;
use std::fmt;
use std::time::Instant;

use crate::config::{InputPaths, ParallelConfig};
use crate::error::Result;
use crate::models::{
    DiagnosisCodeRecord, Encounter, InfectionEvidenceEvent, LabItem, LabResult,
    ProcedureCodeRecord, ProcedureCodeTitle, ProcedureInterval, ProcedureItem, VitalItem,
    VitalReading,
};
use crate::utils::io::load_parquet_path;
use crate::utils::logging::{create_spinner, finish_progress_bar, log_warning};
use crate::validation::ValidationReport;

/// The input streams of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputTable {
    /// `{subject_id, hadm_id, admittime, dischtime}`
    Admissions,
    /// `{subject_id, hadm_id, charttime, specimen_type_description, organism_name}`
    MicrobiologyEvents,
    /// `{subject_id, hadm_id, itemid, starttime, endtime}`
    ProcedureEvents,
    /// `{itemid, order_category_name}`
    ProcedureDictionary,
    /// `{subject_id, hadm_id, icd_code}`
    DiagnosisProcedures,
    /// `{icd_code, long_title}`
    ProcedureCodeDictionary,
    /// `{subject_id, hadm_id, itemid, charttime, value}`
    LabEvents,
    /// `{itemid, label}`
    LabDictionary,
    /// `{subject_id, hadm_id, itemid, charttime, value}`
    ChartEvents,
    /// `{itemid, label}`
    VitalsDictionary,
    /// `{subject_id, hadm_id, icd_code, icd_version}`
    DiagnosisCodes,
}

impl InputTable {
    /// Every input table
    pub const ALL: [Self; 11] = [
        Self::Admissions,
        Self::MicrobiologyEvents,
        Self::ProcedureEvents,
        Self::ProcedureDictionary,
        Self::DiagnosisProcedures,
        Self::ProcedureCodeDictionary,
        Self::LabEvents,
        Self::LabDictionary,
        Self::ChartEvents,
        Self::VitalsDictionary,
        Self::DiagnosisCodes,
    ];

    /// File or directory name of the table
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Admissions => "admissions",
            Self::MicrobiologyEvents => "microbiologyevents",
            Self::ProcedureEvents => "procedureevents",
            Self::ProcedureDictionary => "procedure_dictionary",
            Self::DiagnosisProcedures => "procedures_icd",
            Self::ProcedureCodeDictionary => "d_icd_procedures",
            Self::LabEvents => "labevents",
            Self::LabDictionary => "d_labitems",
            Self::ChartEvents => "chartevents",
            Self::VitalsDictionary => "vitals_dictionary",
            Self::DiagnosisCodes => "diagnoses_icd",
        }
    }
}

impl fmt::Display for InputTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// All input streams, typed and validated at record level
#[derive(Debug, Clone, Default)]
pub struct ClinicalTables {
    /// Admissions
    pub encounters: Vec<Encounter>,
    /// Microbiology results
    pub infection_events: Vec<InfectionEvidenceEvent>,
    /// Charted procedures
    pub procedure_intervals: Vec<ProcedureInterval>,
    /// Procedure item dictionary
    pub procedure_items: Vec<ProcedureItem>,
    /// Coded procedures
    pub procedure_codes: Vec<ProcedureCodeRecord>,
    /// ICD procedure dictionary
    pub procedure_code_titles: Vec<ProcedureCodeTitle>,
    /// Lab results
    pub lab_results: Vec<LabResult>,
    /// Lab item dictionary
    pub lab_items: Vec<LabItem>,
    /// Charted vital signs
    pub vital_readings: Vec<VitalReading>,
    /// Chart item dictionary
    pub vital_items: Vec<VitalItem>,
    /// Coded diagnoses
    pub diagnosis_codes: Vec<DiagnosisCodeRecord>,
}

impl ClinicalTables {
    /// Load every table from `paths`.
    ///
    /// A table that is absent on disk loads as empty with a warning; the
    /// criteria that depend on it simply never fire. Admissions and
    /// microbiology are the exception: without them there is no cohort.
    pub fn load(
        paths: &InputPaths,
        parallel: &ParallelConfig,
        report: &mut ValidationReport,
    ) -> Result<Self> {
        let start = Instant::now();
        let spinner = create_spinner(Some("Loading input tables"), parallel.show_progress);

        let load = |table: InputTable, required: bool| -> Result<Vec<RecordBatch>> {
            spinner.set_message(format!("Loading {table}"));
            let path = paths.resolve(table);
            if !path.exists() {
                if required {
                    return Err(crate::error::CohortError::path_io(
                        &path,
                        format!("Required table '{table}' not found"),
                    ));
                }
                log_warning(&format!("Optional table '{table}' not found"), Some(&path));
                return Ok(Vec::new());
            }
            load_parquet_path(&path, parallel.batch_size)
        };

        let admissions = load(InputTable::Admissions, true)?;
        let microbiology = load(InputTable::MicrobiologyEvents, true)?;
        let procedure_events = load(InputTable::ProcedureEvents, false)?;
        let procedure_dictionary = load(InputTable::ProcedureDictionary, false)?;
        let procedures_icd = load(InputTable::DiagnosisProcedures, false)?;
        let procedure_code_dictionary = load(InputTable::ProcedureCodeDictionary, false)?;
        let lab_events = load(InputTable::LabEvents, false)?;
        let lab_dictionary = load(InputTable::LabDictionary, false)?;
        let chart_events = load(InputTable::ChartEvents, false)?;
        let vitals_dictionary = load(InputTable::VitalsDictionary, false)?;
        let diagnoses = load(InputTable::DiagnosisCodes, false)?;

        let tables = Self {
            encounters: deserializer::admissions(&admissions, report)?,
            infection_events: deserializer::microbiology_events(&microbiology, report)?,
            procedure_intervals: deserializer::procedure_events(&procedure_events, report)?,
            procedure_items: deserializer::procedure_items(&procedure_dictionary, report)?,
            procedure_codes: deserializer::procedure_codes(&procedures_icd, report)?,
            procedure_code_titles: deserializer::procedure_code_titles(
                &procedure_code_dictionary,
                report,
            )?,
            lab_results: deserializer::lab_events(&lab_events, report)?,
            lab_items: deserializer::lab_items(&lab_dictionary, report)?,
            vital_readings: deserializer::chart_events(&chart_events, report)?,
            vital_items: deserializer::vital_items(&vitals_dictionary, report)?,
            diagnosis_codes: deserializer::diagnosis_codes(&diagnoses, report)?,
        };

        finish_progress_bar(&spinner, Some("Input tables loaded"));
        log::info!(
            "Loaded {} encounters and {} microbiology events in {:?}",
            tables.encounters.len(),
            tables.infection_events.len(),
            start.elapsed()
        );
        Ok(tables)
    }
}
