//! Error handling for the cohort pipeline.
//!
//! Only whole-run failures are errors. Problems with a single input record
//! are reported through [`crate::validation::ValidationReport`] instead.

pub mod util;

use std::io;
use std::path::{Path, PathBuf};

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Specialized error type for the cohort pipeline
#[derive(Debug, thiserror::Error)]
pub enum CohortError {
    /// Error opening or reading a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// IO error tied to a specific path
    #[error("IO error at {path}: {message}")]
    PathIo {
        /// Path that failed
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error processing Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error converting rows to or from Arrow via `serde_arrow`
    #[error("Serialization error: {0}")]
    SerdeArrow(#[from] serde_arrow::Error),

    /// Error parsing a JSON configuration file
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// A required column is missing from an input table
    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound {
        /// Input table name
        table: String,
        /// Missing column name
        column: String,
    },

    /// A column could not be adapted to the type the pipeline needs
    #[error("Column '{column}' could not be read as {expected}")]
    InvalidDataType {
        /// Column name
        column: String,
        /// Expected Arrow type
        expected: String,
    },

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl CohortError {
    /// Create an IO error for a path
    pub fn path_io(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::PathIo {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Create a missing column error
    pub fn column_not_found(table: &str, column: &str) -> Self {
        Self::ColumnNotFound {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    /// Create a configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result type for cohort pipeline operations
pub type Result<T> = std::result::Result<T, CohortError>;
