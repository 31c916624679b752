//! Terminology dictionary rows
//!
//! These are the raw reference streams the criterion lookups are built from.

use serde::{Deserialize, Serialize};

/// Procedure item dictionary row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureItem {
    /// Procedure item identifier
    pub item_id: i64,
    /// Order category, e.g. "Invasive Lines"
    pub order_category_name: Option<String>,
}

/// ICD procedure code dictionary row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureCodeTitle {
    /// ICD procedure code
    pub icd_code: String,
    /// Long description
    pub long_title: Option<String>,
}

/// Lab item dictionary row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabItem {
    /// Lab item identifier
    pub item_id: i64,
    /// Analyte label
    pub label: Option<String>,
}

/// Chart (vital sign) item dictionary row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalItem {
    /// Chart item identifier
    pub item_id: i64,
    /// Measurement label
    pub label: Option<String>,
}
