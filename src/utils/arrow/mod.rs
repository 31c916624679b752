//! Arrow data handling utilities
//!
//! This module contains utilities for working with Arrow arrays and record
//! batches: type adaptation of input columns and typed value extraction.

pub mod array_utils;
pub mod extractors;

// Re-export commonly used functions for convenience
pub use array_utils::{downcast_array, get_column};
pub use extractors::{float64_column, int64_column, string_column, timestamp_column};
