//! Configuration for the cohort pipeline.
//!
//! The defaults reproduce the reference cohort definition. A JSON file can
//! override any subset of fields.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::util::safe_read_to_string;
use crate::error::{CohortError, Result};
use crate::tables::InputTable;

/// Environment variable overriding the worker count
pub const THREADS_ENV: &str = "SAB_COHORT_THREADS";

/// Environment variable overriding the Parquet batch size
pub const BATCH_SIZE_ENV: &str = "SAB_COHORT_BATCH_SIZE";

/// Default batch size for Parquet reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Upper bound on every configured window and duration, in days
pub const MAX_WINDOW_DAYS: i64 = 3650;

/// Thresholds, windows and vocabularies of the cohort definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sentinel offsets above this many hours are late onset
    pub late_onset_hours: i64,
    /// Surgery is estimated this many days after admission
    pub surgery_offset_days: i64,
    /// Sentinel must fall within this many days after the surgery estimate
    pub surgery_window_days: i64,
    /// Half-width of the invasive procedure window, in hours
    pub invasive_window_hours: i64,
    /// ANC values strictly below this (x10^9/L) count as low
    pub anc_threshold: f64,
    /// Half-width of the neutropenia window, in calendar days
    pub anc_window_days: i64,
    /// Minimum distinct low-ANC days
    pub anc_min_days: usize,
    /// Systolic readings strictly below this (mmHg) are low
    pub sbp_threshold: f64,
    /// Minimum hypotension interval length, in minutes
    pub min_hypotension_minutes: i64,
    /// Minimum hypotension remaining after the sentinel, in minutes
    pub min_post_sentinel_minutes: i64,
    /// Token the specimen type must contain
    pub specimen_token: String,
    /// Tokens the organism name must all contain
    pub organism_tokens: Vec<String>,
    /// Words marking an ICD procedure title as surgical
    pub surgery_vocabulary: Vec<String>,
    /// Procedure order categories that count as devices
    pub device_categories: Vec<String>,
    /// Lab label of the absolute neutrophil count
    pub anc_label: String,
    /// Tokens a chart label must all contain to be systolic blood pressure
    pub sbp_label_tokens: Vec<String>,
    /// Diagnosis codes used for the concordance label
    pub reference_diagnosis_codes: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            late_onset_hours: 48,
            surgery_offset_days: 1,
            surgery_window_days: 29,
            invasive_window_hours: 48,
            anc_threshold: 0.5,
            anc_window_days: 3,
            anc_min_days: 2,
            sbp_threshold: 100.0,
            min_hypotension_minutes: 60,
            min_post_sentinel_minutes: 60,
            specimen_token: "blood".to_string(),
            organism_tokens: vec!["staph".to_string(), "aureus".to_string()],
            surgery_vocabulary: vec![
                "surgery".to_string(),
                "procedure".to_string(),
                "operation".to_string(),
            ],
            device_categories: vec![
                "Invasive Lines".to_string(),
                "Peripheral Lines".to_string(),
                "Dialysis".to_string(),
                "Intubation/Extubation".to_string(),
                "Ventilation".to_string(),
            ],
            anc_label: "absolute neutrophil count".to_string(),
            sbp_label_tokens: vec!["systolic".to_string(), "blood pressure".to_string()],
            reference_diagnosis_codes: vec![
                "03811".to_string(),
                "03812".to_string(),
                "A4101".to_string(),
                "A4102".to_string(),
            ],
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with the reference defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load overrides from a JSON file; absent fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = safe_read_to_string(path, "pipeline configuration")?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        log::info!("Loaded pipeline configuration from {}", path.display());
        Ok(config)
    }

    /// Set the late-onset cutoff
    #[must_use]
    pub fn with_late_onset_hours(mut self, hours: i64) -> Self {
        self.late_onset_hours = hours;
        self
    }

    /// Set the systolic threshold
    #[must_use]
    pub fn with_sbp_threshold(mut self, threshold: f64) -> Self {
        self.sbp_threshold = threshold;
        self
    }

    /// Set the minimum hypotension length
    #[must_use]
    pub fn with_min_hypotension_minutes(mut self, minutes: i64) -> Self {
        self.min_hypotension_minutes = minutes;
        self
    }

    /// Set the device order categories
    #[must_use]
    pub fn with_device_categories(mut self, categories: Vec<String>) -> Self {
        self.device_categories = categories;
        self
    }

    /// Set the concordance reference codes
    #[must_use]
    pub fn with_reference_diagnosis_codes(mut self, codes: Vec<String>) -> Self {
        self.reference_diagnosis_codes = codes;
        self
    }

    /// Reject windows and durations that cannot describe a cohort
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("late_onset_hours", self.late_onset_hours),
            ("surgery_offset_days", self.surgery_offset_days),
            ("surgery_window_days", self.surgery_window_days),
            ("invasive_window_hours", self.invasive_window_hours),
            ("anc_window_days", self.anc_window_days),
            ("min_post_sentinel_minutes", self.min_post_sentinel_minutes),
        ];
        for (name, value) in non_negative {
            if value < 0 {
                return Err(CohortError::invalid_config(format!(
                    "{name} must not be negative (got {value})"
                )));
            }
        }

        let max_window = TimeDelta::days(MAX_WINDOW_DAYS);
        let windows = [
            ("late_onset_hours", TimeDelta::try_hours(self.late_onset_hours)),
            ("surgery_offset_days", TimeDelta::try_days(self.surgery_offset_days)),
            ("surgery_window_days", TimeDelta::try_days(self.surgery_window_days)),
            ("invasive_window_hours", TimeDelta::try_hours(self.invasive_window_hours)),
            ("anc_window_days", TimeDelta::try_days(self.anc_window_days)),
            ("min_hypotension_minutes", TimeDelta::try_minutes(self.min_hypotension_minutes)),
            (
                "min_post_sentinel_minutes",
                TimeDelta::try_minutes(self.min_post_sentinel_minutes),
            ),
        ];
        for (name, window) in windows {
            if window.is_none_or(|window| window > max_window) {
                return Err(CohortError::invalid_config(format!(
                    "{name} must not exceed {MAX_WINDOW_DAYS} days"
                )));
            }
        }

        if self.min_hypotension_minutes <= 0 {
            return Err(CohortError::invalid_config(
                "min_hypotension_minutes must be positive",
            ));
        }
        if self.anc_min_days == 0 {
            return Err(CohortError::invalid_config("anc_min_days must be at least 1"));
        }
        if !self.anc_threshold.is_finite() || !self.sbp_threshold.is_finite() {
            return Err(CohortError::invalid_config("thresholds must be finite numbers"));
        }
        if self.specimen_token.trim().is_empty() || self.organism_tokens.is_empty() {
            return Err(CohortError::invalid_config(
                "specimen and organism tokens must not be empty",
            ));
        }
        Ok(())
    }

    /// Late-onset cutoff
    #[must_use]
    pub fn late_onset_cutoff(&self) -> TimeDelta {
        saturating(TimeDelta::try_hours(self.late_onset_hours), self.late_onset_hours)
    }

    /// Offset from admission to the estimated surgery time
    #[must_use]
    pub fn surgery_offset(&self) -> TimeDelta {
        saturating(TimeDelta::try_days(self.surgery_offset_days), self.surgery_offset_days)
    }

    /// Length of the window after the surgery estimate
    #[must_use]
    pub fn surgery_window(&self) -> TimeDelta {
        saturating(TimeDelta::try_days(self.surgery_window_days), self.surgery_window_days)
    }

    /// Half-width of the invasive procedure window
    #[must_use]
    pub fn invasive_window(&self) -> TimeDelta {
        saturating(TimeDelta::try_hours(self.invasive_window_hours), self.invasive_window_hours)
    }

    /// Half-width of the neutropenia window
    #[must_use]
    pub fn anc_window(&self) -> TimeDelta {
        saturating(TimeDelta::try_days(self.anc_window_days), self.anc_window_days)
    }

    /// Minimum hypotension interval length
    #[must_use]
    pub fn min_hypotension_duration(&self) -> TimeDelta {
        saturating(
            TimeDelta::try_minutes(self.min_hypotension_minutes),
            self.min_hypotension_minutes,
        )
    }

    /// Minimum hypotension remaining after the sentinel
    #[must_use]
    pub fn min_post_sentinel_duration(&self) -> TimeDelta {
        saturating(
            TimeDelta::try_minutes(self.min_post_sentinel_minutes),
            self.min_post_sentinel_minutes,
        )
    }
}

/// Out-of-range windows of an unvalidated config clamp to the widest delta
fn saturating(window: Option<TimeDelta>, value: i64) -> TimeDelta {
    window.unwrap_or(if value < 0 { TimeDelta::MIN } else { TimeDelta::MAX })
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline Configuration:")?;
        writeln!(f, "  Late Onset Cutoff: {} h", self.late_onset_hours)?;
        writeln!(
            f,
            "  Surgery Window: admission + {} d, for {} d",
            self.surgery_offset_days, self.surgery_window_days
        )?;
        writeln!(f, "  Invasive Window: +/- {} h", self.invasive_window_hours)?;
        writeln!(
            f,
            "  Neutropenia: ANC < {} on >= {} days within +/- {} d",
            self.anc_threshold, self.anc_min_days, self.anc_window_days
        )?;
        writeln!(
            f,
            "  Hypotension: SBP < {} for >= {} min, >= {} min after sentinel",
            self.sbp_threshold, self.min_hypotension_minutes, self.min_post_sentinel_minutes
        )?;
        writeln!(
            f,
            "  Organism: {} in '{}' specimens",
            self.organism_tokens.join(" + "),
            self.specimen_token
        )?;
        writeln!(f, "  Device Categories: {}", self.device_categories.join(", "))?;
        writeln!(
            f,
            "  Reference Diagnosis Codes: {}",
            self.reference_diagnosis_codes.join(", ")
        )?;
        Ok(())
    }
}

/// Worker and batch settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Number of rayon worker threads
    pub threads: usize,
    /// Parquet batch size
    pub batch_size: usize,
    /// Whether to draw progress bars
    pub show_progress: bool,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get(),
            batch_size: DEFAULT_BATCH_SIZE,
            show_progress: true,
        }
    }
}

impl ParallelConfig {
    /// Defaults overridden by [`THREADS_ENV`] and [`BATCH_SIZE_ENV`]
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(threads) = env_usize(THREADS_ENV).filter(|&n| n > 0) {
            config.threads = threads;
        }
        if let Some(batch_size) = env_usize(BATCH_SIZE_ENV).filter(|&n| n > 0) {
            config.batch_size = batch_size;
        }
        config
    }

    /// Set the worker count
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Enable or disable progress bars
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|s| s.trim().parse::<usize>().ok())
}

/// Locations of the input tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPaths {
    /// Directory holding one entry per table
    pub base_dir: PathBuf,
}

impl InputPaths {
    /// Input tables under `base_dir`
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Location of a table: `<base>/<table>` if it is a directory of Parquet
    /// files, otherwise `<base>/<table>.parquet`
    #[must_use]
    pub fn resolve(&self, table: InputTable) -> PathBuf {
        let dir = self.base_dir.join(table.name());
        if dir.is_dir() {
            dir
        } else {
            self.base_dir.join(format!("{}.parquet", table.name()))
        }
    }
}
