use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::time::Instant;

use sab_cohort::algorithm::sab::{CohortStatistics, generate_summary, run_from_tables};
use sab_cohort::config::{InputPaths, ParallelConfig, PipelineConfig, THREADS_ENV};
use sab_cohort::output::{OutputFormat, write_cohort};
use sab_cohort::tables::ClinicalTables;
use sab_cohort::validation::ValidationReport;

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

/// Derive the hypotension-linked S. aureus bacteremia cohort
#[derive(Parser, Debug)]
#[command(name = "sab-cohort")]
#[command(version)]
#[command(about = "Classify S. aureus bacteremia episodes and link them to sustained hypotension")]
struct Args {
    /// Directory holding one parquet file or directory per input table
    #[arg(short, long, value_name = "DIR")]
    input: PathBuf,

    /// Output file
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Output format: parquet or csv
    #[arg(short, long, value_name = "FORMAT", default_value = "parquet")]
    format: String,

    /// JSON file overriding thresholds and vocabularies
    #[arg(short, long, value_name = "JSON")]
    config: Option<PathBuf>,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(short, long, env = THREADS_ENV)]
    threads: Option<usize>,

    /// Do not draw progress bars
    #[arg(long)]
    no_progress: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let start = Instant::now();

    let format: OutputFormat = args.format.parse()?;
    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config.validate().context("Invalid pipeline configuration")?;
    info!("Pipeline configuration:\n{config}");

    let mut parallel = ParallelConfig::from_env().with_progress(!args.no_progress);
    if let Some(threads) = args.threads {
        parallel = parallel.with_threads(threads);
    }

    let mut report = ValidationReport::new();
    let tables = ClinicalTables::load(&InputPaths::new(&args.input), &parallel, &mut report)
        .with_context(|| format!("Failed to load input tables from {}", args.input.display()))?;

    let result = run_from_tables(&tables, &config, &parallel, &mut report)?;
    report.log();

    let stats = CohortStatistics::from_result(&result);
    println!("{}", generate_summary(&stats, &result.concordance));

    write_cohort(&result.records, &args.output, format)
        .with_context(|| format!("Failed to write cohort to {}", args.output.display()))?;

    info!(
        "Wrote {} cohort rows to {} in {:?}",
        result.records.len(),
        args.output.display(),
        start.elapsed()
    );
    Ok(())
}
