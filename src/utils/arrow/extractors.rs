//! Column extraction utilities for Arrow record batches
//!
//! Each extractor adapts a column to one target type and returns one
//! `Option` per row, `None` for nulls. A missing optional column yields a
//! vector of `None`s so row-wise code never branches on column presence.

use arrow::array::{Array, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDateTime};

use crate::error::Result;
use crate::utils::arrow::array_utils::{downcast_array, get_column};

/// Extract an integer column (identifiers, item ids, ICD versions)
pub fn int64_column(
    batch: &RecordBatch,
    table: &str,
    column_name: &str,
    required: bool,
) -> Result<Vec<Option<i64>>> {
    let Some(array) = get_column(batch, table, column_name, &DataType::Int64, required)? else {
        return Ok(vec![None; batch.num_rows()]);
    };
    let values = downcast_array::<Int64Array>(&array, column_name, "Int64")?;
    Ok(values.iter().collect())
}

/// Extract a floating point column; strings are parsed, failures become null
pub fn float64_column(
    batch: &RecordBatch,
    table: &str,
    column_name: &str,
    required: bool,
) -> Result<Vec<Option<f64>>> {
    let Some(array) = get_column(batch, table, column_name, &DataType::Float64, required)? else {
        return Ok(vec![None; batch.num_rows()]);
    };
    let values = downcast_array::<Float64Array>(&array, column_name, "Float64")?;
    Ok(values
        .iter()
        .map(|value| value.filter(|v| v.is_finite()))
        .collect())
}

/// Extract a string column; empty strings become null
pub fn string_column(
    batch: &RecordBatch,
    table: &str,
    column_name: &str,
    required: bool,
) -> Result<Vec<Option<String>>> {
    let Some(array) = get_column(batch, table, column_name, &DataType::Utf8, required)? else {
        return Ok(vec![None; batch.num_rows()]);
    };
    let values = downcast_array::<StringArray>(&array, column_name, "String")?;
    Ok(values
        .iter()
        .map(|value| {
            value
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect())
}

/// Extract a timestamp column as naive date-times.
///
/// Timestamps of any unit and ISO-8601 strings (`2150-01-01 10:00:00`) are
/// accepted; anything unparseable becomes null.
pub fn timestamp_column(
    batch: &RecordBatch,
    table: &str,
    column_name: &str,
    required: bool,
) -> Result<Vec<Option<NaiveDateTime>>> {
    let target = DataType::Timestamp(TimeUnit::Microsecond, None);
    let Some(array) = get_column(batch, table, column_name, &target, required)? else {
        return Ok(vec![None; batch.num_rows()]);
    };
    let values = downcast_array::<TimestampMicrosecondArray>(&array, column_name, "Timestamp")?;
    Ok(values
        .iter()
        .map(|value| value.and_then(micros_to_naive))
        .collect())
}

/// Convert microseconds since the epoch to a naive date-time
#[must_use]
pub fn micros_to_naive(micros: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_micros(micros).map(|dt| dt.naive_utc())
}
