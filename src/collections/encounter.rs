//! Per-encounter event index
//!
//! Every stream is grouped by [`EncounterKey`] and sorted by time, with the
//! record id as secondary key. Records that are irrelevant to any criterion
//! (non-device procedures, non-ANC labs, non-systolic vitals) are left out.

use rustc_hash::FxHashMap;

use crate::config::PipelineConfig;
use crate::lookup::CriterionLookups;
use crate::models::{
    Encounter, EncounterKey, InfectionEvidenceEvent, LabResult, ProcedureInterval,
    SurgicalProcedureRecord, VitalReading,
};
use crate::tables::{ClinicalTables, InputTable};
use crate::validation::{RejectionReason, ValidationReport};

/// Everything the pipeline needs about one encounter
#[derive(Debug, Clone)]
pub struct EncounterEvents<'a> {
    /// The admission
    pub encounter: &'a Encounter,
    /// Microbiology results, by (time, record id)
    pub infection_events: Vec<&'a InfectionEvidenceEvent>,
    /// Device procedures, by (start, record id)
    pub device_intervals: Vec<&'a ProcedureInterval>,
    /// Surgical procedures with estimated times
    pub surgeries: Vec<SurgicalProcedureRecord>,
    /// ANC results, by (time, record id)
    pub anc_results: Vec<&'a LabResult>,
    /// Systolic pressure readings, by (time, record id)
    pub sbp_readings: Vec<&'a VitalReading>,
    /// Whether any coded diagnosis is in the concordance reference set
    pub has_reference_diagnosis: bool,
}

impl<'a> EncounterEvents<'a> {
    fn new(encounter: &'a Encounter) -> Self {
        Self {
            encounter,
            infection_events: Vec::new(),
            device_intervals: Vec::new(),
            surgeries: Vec::new(),
            anc_results: Vec::new(),
            sbp_readings: Vec::new(),
            has_reference_diagnosis: false,
        }
    }

    /// Encounter key
    #[must_use]
    pub fn key(&self) -> EncounterKey {
        self.encounter.key
    }

    fn sort(&mut self) {
        self.infection_events
            .sort_by_key(|event| (event.event_time, event.record_id));
        self.device_intervals
            .sort_by_key(|interval| (interval.start_time, interval.record_id));
        self.surgeries
            .sort_by(|a, b| (a.estimated_time, &a.icd_code).cmp(&(b.estimated_time, &b.icd_code)));
        self.anc_results
            .sort_by_key(|result| (result.sample_time, result.record_id));
        self.sbp_readings
            .sort_by_key(|reading| (reading.measurement_time, reading.record_id));
    }
}

/// Encounter-keyed view over [`ClinicalTables`], ordered by key
#[derive(Debug, Clone, Default)]
pub struct EncounterIndex<'a> {
    encounters: Vec<EncounterEvents<'a>>,
    positions: FxHashMap<EncounterKey, usize>,
}

impl<'a> EncounterIndex<'a> {
    /// Group every stream by encounter.
    ///
    /// Records referring to an unknown admission are counted as rejected.
    /// Duplicate admissions keep the first occurrence; the others are counted
    /// as rejected too.
    pub fn build(
        tables: &'a ClinicalTables,
        lookups: &CriterionLookups,
        config: &PipelineConfig,
        report: &mut ValidationReport,
    ) -> Self {
        let mut encounters: Vec<EncounterEvents<'a>> = Vec::with_capacity(tables.encounters.len());
        let mut positions = FxHashMap::default();

        let mut sorted: Vec<&Encounter> = tables.encounters.iter().collect();
        sorted.sort_by_key(|encounter| encounter.key);
        for encounter in sorted {
            if positions.contains_key(&encounter.key) {
                log::warn!("Duplicate admission {} ignored", encounter.key);
                report.reject(InputTable::Admissions, RejectionReason::DuplicateEncounter);
                continue;
            }
            positions.insert(encounter.key, encounters.len());
            encounters.push(EncounterEvents::new(encounter));
        }

        let slot = |key: EncounterKey, table: InputTable, report: &mut ValidationReport| {
            let position = positions.get(&key).copied();
            if position.is_none() {
                report.reject(table, RejectionReason::UnknownEncounter);
            }
            position
        };

        for event in &tables.infection_events {
            if let Some(i) = slot(event.key, InputTable::MicrobiologyEvents, report) {
                encounters[i].infection_events.push(event);
            }
        }

        for interval in &tables.procedure_intervals {
            if let Some(i) = slot(interval.key, InputTable::ProcedureEvents, report) {
                if lookups.is_device(interval.item_id) {
                    encounters[i].device_intervals.push(interval);
                }
            }
        }

        for procedure in &tables.procedure_codes {
            if let Some(i) = slot(procedure.key, InputTable::DiagnosisProcedures, report) {
                if lookups.is_surgical(&procedure.icd_code) {
                    let admission_time = encounters[i].encounter.admission_time;
                    if let Some(estimated_time) =
                        admission_time.checked_add_signed(config.surgery_offset())
                    {
                        encounters[i].surgeries.push(SurgicalProcedureRecord {
                            key: procedure.key,
                            icd_code: procedure.icd_code.clone(),
                            estimated_time,
                        });
                    }
                }
            }
        }

        for result in &tables.lab_results {
            if let Some(i) = slot(result.key, InputTable::LabEvents, report) {
                if lookups.is_anc(result.item_id) {
                    encounters[i].anc_results.push(result);
                }
            }
        }

        for reading in &tables.vital_readings {
            if let Some(i) = slot(reading.key, InputTable::ChartEvents, report) {
                if lookups.is_sbp(reading.item_id) {
                    encounters[i].sbp_readings.push(reading);
                }
            }
        }

        for diagnosis in &tables.diagnosis_codes {
            if let Some(i) = slot(diagnosis.key, InputTable::DiagnosisCodes, report) {
                if lookups.is_reference_diagnosis(&diagnosis.icd_code) {
                    encounters[i].has_reference_diagnosis = true;
                }
            }
        }

        for events in &mut encounters {
            events.sort();
        }

        Self {
            encounters,
            positions,
        }
    }

    /// Events of one encounter
    #[must_use]
    pub fn get(&self, key: &EncounterKey) -> Option<&EncounterEvents<'a>> {
        self.positions.get(key).map(|&i| &self.encounters[i])
    }

    /// All encounters, ordered by key
    #[must_use]
    pub fn encounters(&self) -> &[EncounterEvents<'a>] {
        &self.encounters
    }

    /// Number of encounters
    #[must_use]
    pub fn len(&self) -> usize {
        self.encounters.len()
    }

    /// Whether the index holds no encounters
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.encounters.is_empty()
    }
}
