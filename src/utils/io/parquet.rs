//! Parquet file operations
//!
//! This module provides utilities for finding Parquet files, reading them
//! into Arrow record batches in parallel, and writing result batches.

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rayon::prelude::*;

use crate::error::util::validate_directory;
use crate::error::{CohortError, Result};
use crate::utils::logging::{log_operation_complete, log_operation_start, log_warning};

/// Read a parquet file into Arrow record batches
///
/// # Arguments
/// * `path` - Path to the Parquet file
/// * `batch_size` - Rows per record batch
///
/// # Errors
/// Returns an error if the file cannot be opened or if the Parquet file is invalid
pub fn read_parquet(path: &Path, batch_size: usize) -> Result<Vec<RecordBatch>> {
    let start = std::time::Instant::now();
    log_operation_start("Reading parquet file", path);

    let file = File::open(path)
        .map_err(|e| CohortError::path_io(path, format!("Failed to open file: {e}")))?;

    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
        .with_batch_size(batch_size)
        .build()?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;

    log_operation_complete(
        "read",
        &path.display().to_string(),
        batches.len(),
        Some(start.elapsed()),
    );
    Ok(batches)
}

/// Find all Parquet files in a directory, sorted by file name
///
/// The order is part of the input contract: record ids are assigned in
/// file order, so it must not depend on the filesystem.
///
/// # Errors
/// Returns an error if directory reading fails
pub fn find_parquet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    log_operation_start("Searching for parquet files in", dir);
    validate_directory(dir, "parquet input")?;

    let parquet_files = std::fs::read_dir(dir)
        .map_err(|e| CohortError::path_io(dir, format!("Failed to read directory: {e}")))?
        .map(|entry_result| {
            entry_result
                .map(|entry| entry.path())
                .map_err(|e| CohortError::path_io(dir, format!("Failed to read directory entry: {e}")))
        })
        .filter_ok(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "parquet"))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .sorted()
        .collect_vec();

    if parquet_files.is_empty() {
        log_warning("No Parquet files found in directory", Some(dir));
    } else {
        log_operation_complete("found", &dir.display().to_string(), parquet_files.len(), None);
    }

    Ok(parquet_files)
}

/// Load a single Parquet file, or every Parquet file of a directory in parallel
///
/// Batches keep file order, then batch order within each file.
///
/// # Errors
/// Returns an error if the path does not exist or any file cannot be read
pub fn load_parquet_path(path: &Path, batch_size: usize) -> Result<Vec<RecordBatch>> {
    if path.is_file() {
        return read_parquet(path, batch_size);
    }

    let parquet_files = find_parquet_files(path)?;
    if parquet_files.is_empty() {
        return Ok(Vec::new());
    }

    // Indexed parallel collect preserves file order
    let per_file: Vec<Vec<RecordBatch>> = parquet_files
        .par_iter()
        .map(|file| read_parquet(file, batch_size))
        .collect::<Result<Vec<_>>>()?;

    let combined = per_file.into_iter().flatten().collect_vec();
    log::info!(
        "Successfully loaded {} batches from {} Parquet files",
        combined.len(),
        parquet_files.len()
    );
    Ok(combined)
}

/// Write a record batch to a Parquet file (Snappy compressed)
///
/// # Errors
/// Returns an error if the file cannot be created or written
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| CohortError::path_io(path, format!("Failed to create file: {e}")))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;

    log_operation_complete("wrote", &path.display().to_string(), batch.num_rows(), None);
    Ok(())
}

/// Write a record batch to a CSV file with a header row
///
/// # Errors
/// Returns an error if the file cannot be created or written
pub fn write_csv(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| CohortError::path_io(path, format!("Failed to create file: {e}")))?;

    let mut writer = arrow::csv::WriterBuilder::new().with_header(true).build(file);
    writer.write(batch)?;

    log_operation_complete("wrote", &path.display().to_string(), batch.num_rows(), None);
    Ok(())
}
