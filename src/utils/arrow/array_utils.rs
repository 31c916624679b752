//! Utilities for working with Arrow arrays.
//!
//! This module provides utility functions for safely extracting columns from
//! record batches, adapting them to the type the pipeline expects.

use arrow::array::{Array, ArrayRef};
use arrow::compute::{CastOptions, cast_with_options};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use log::{debug, warn};

use crate::error::{CohortError, Result};

/// Get a column from a record batch with automatic type adaptation
///
/// If the column has a different type than `expected_type`, it is cast with
/// Arrow's cast kernel in safe mode: values that cannot be converted (for
/// example a non-numeric string in a numeric column) become null instead of
/// failing the whole batch.
///
/// # Arguments
///
/// * `batch` - The record batch containing the column
/// * `table` - Name of the input table (for error messages)
/// * `column_name` - The name of the column to extract
/// * `expected_type` - The expected data type for the column
/// * `required` - Whether the column is required (error if missing) or optional (None if missing)
///
/// # Returns
///
/// * `Ok(Some(ArrayRef))` - The column array (converted if necessary) if found
/// * `Ok(None)` - If the column is not found and `required` is false
/// * `Err(CohortError)` - If the column is not found and `required` is true, or if the cast fails
pub fn get_column(
    batch: &RecordBatch,
    table: &str,
    column_name: &str,
    expected_type: &DataType,
    required: bool,
) -> Result<Option<ArrayRef>> {
    let idx = if let Ok(idx) = batch.schema().index_of(column_name) {
        idx
    } else {
        if required {
            return Err(CohortError::column_not_found(table, column_name));
        }
        warn!("Column '{column_name}' not found in table '{table}'");
        return Ok(None);
    };

    let column = batch.column(idx);
    let actual_type = column.data_type();

    if actual_type == expected_type {
        return Ok(Some(column.clone()));
    }

    debug!("Converting column '{column_name}' from {actual_type:?} to {expected_type:?}");

    // Safe casting turns unconvertible values into nulls
    let options = CastOptions::default();
    let converted = cast_with_options(column, expected_type, &options).map_err(|e| {
        warn!("Failed to convert column '{column_name}' to {expected_type:?}: {e}");
        CohortError::InvalidDataType {
            column: column_name.to_string(),
            expected: format!("{expected_type:?}"),
        }
    })?;

    Ok(Some(converted))
}

/// Downcast a column to a specific array type with clear error messages
///
/// # Type Parameters
///
/// * `A` - The target array type to downcast to
///
/// # Arguments
///
/// * `array` - The array reference to downcast
/// * `column_name` - The name of the column (for error messages)
/// * `expected_type_name` - A human-readable name of the expected type (for error messages)
pub fn downcast_array<'a, A: Array + 'static>(
    array: &'a ArrayRef,
    column_name: &str,
    expected_type_name: &str,
) -> Result<&'a A> {
    array
        .as_any()
        .downcast_ref::<A>()
        .ok_or_else(|| CohortError::InvalidDataType {
            column: column_name.to_string(),
            expected: expected_type_name.to_string(),
        })
}
