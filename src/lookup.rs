//! Criterion lookup tables
//!
//! Reference sets resolved once from the terminology dictionaries and the
//! configured vocabularies, then shared read-only by every worker.

use rustc_hash::FxHashSet;

use crate::config::PipelineConfig;
use crate::models::events::contains_ignore_case;
use crate::tables::ClinicalTables;

/// Immutable reference sets used by the classification criteria
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriterionLookups {
    /// Procedure items whose order category is a device category
    pub device_items: FxHashSet<i64>,
    /// Lab items measuring the absolute neutrophil count
    pub anc_items: FxHashSet<i64>,
    /// Chart items measuring systolic blood pressure
    pub sbp_items: FxHashSet<i64>,
    /// ICD procedure codes whose title marks them as surgical
    pub surgical_codes: FxHashSet<String>,
    /// Diagnosis codes of the concordance label (normalized)
    pub reference_diagnosis_codes: FxHashSet<String>,
}

impl CriterionLookups {
    /// Resolve every lookup set from the dictionary tables
    #[must_use]
    pub fn build(tables: &ClinicalTables, config: &PipelineConfig) -> Self {
        let device_items = tables
            .procedure_items
            .iter()
            .filter(|item| {
                item.order_category_name.as_deref().is_some_and(|category| {
                    config
                        .device_categories
                        .iter()
                        .any(|device| category.trim().eq_ignore_ascii_case(device.trim()))
                })
            })
            .map(|item| item.item_id)
            .collect();

        let anc_items = tables
            .lab_items
            .iter()
            .filter(|item| {
                item.label
                    .as_deref()
                    .is_some_and(|label| contains_ignore_case(label, &config.anc_label))
            })
            .map(|item| item.item_id)
            .collect();

        let sbp_items = tables
            .vital_items
            .iter()
            .filter(|item| {
                item.label.as_deref().is_some_and(|label| {
                    config
                        .sbp_label_tokens
                        .iter()
                        .all(|token| contains_ignore_case(label, token))
                })
            })
            .map(|item| item.item_id)
            .collect();

        let surgical_codes = tables
            .procedure_code_titles
            .iter()
            .filter(|title| {
                title.long_title.as_deref().is_some_and(|text| {
                    config
                        .surgery_vocabulary
                        .iter()
                        .any(|word| contains_ignore_case(text, word))
                })
            })
            .map(|title| normalize_code(&title.icd_code))
            .collect();

        let lookups = Self {
            device_items,
            anc_items,
            sbp_items,
            surgical_codes,
            reference_diagnosis_codes: config
                .reference_diagnosis_codes
                .iter()
                .map(|code| normalize_code(code))
                .collect(),
        };
        lookups.log_summary();
        lookups
    }

    /// Whether a procedure item is a device
    #[must_use]
    pub fn is_device(&self, item_id: i64) -> bool {
        self.device_items.contains(&item_id)
    }

    /// Whether a lab item is an absolute neutrophil count
    #[must_use]
    pub fn is_anc(&self, item_id: i64) -> bool {
        self.anc_items.contains(&item_id)
    }

    /// Whether a chart item is systolic blood pressure
    #[must_use]
    pub fn is_sbp(&self, item_id: i64) -> bool {
        self.sbp_items.contains(&item_id)
    }

    /// Whether an ICD procedure code is surgical
    #[must_use]
    pub fn is_surgical(&self, icd_code: &str) -> bool {
        self.surgical_codes.contains(&normalize_code(icd_code))
    }

    /// Whether a diagnosis code belongs to the concordance reference set
    #[must_use]
    pub fn is_reference_diagnosis(&self, icd_code: &str) -> bool {
        self.reference_diagnosis_codes
            .contains(&normalize_code(icd_code))
    }

    fn log_summary(&self) {
        log::info!(
            "Criterion lookups: {} device items, {} ANC items, {} SBP items, {} surgical codes",
            self.device_items.len(),
            self.anc_items.len(),
            self.sbp_items.len(),
            self.surgical_codes.len()
        );
        if self.device_items.is_empty() {
            log::warn!("No device items resolved; Device and Invasive criteria can never fire");
        }
        if self.sbp_items.is_empty() {
            log::warn!("No systolic blood pressure items resolved; no hypotension can be linked");
        }
    }
}

/// Normalize an ICD code: trimmed, upper case, without dots
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim()
        .chars()
        .filter(|c| *c != '.')
        .collect::<String>()
        .to_uppercase()
}
