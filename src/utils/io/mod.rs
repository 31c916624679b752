//! IO utilities for file operations
//!
//! This module provides utilities for reading and writing Parquet and CSV.

pub mod parquet;

// Re-export commonly used functions for convenience
pub use parquet::{find_parquet_files, load_parquet_path, read_parquet, write_csv, write_parquet};
