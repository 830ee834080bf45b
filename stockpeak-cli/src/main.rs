//! stockpeak CLI — run a configured pipeline, or find the peak of a local CSV.
//!
//! Commands:
//! - `run` — build a pipeline from a TOML config file and run it
//! - `peak` — print the highest-high day of a local CSV file
//! - `inspect` — parse a local CSV file and summarise its records

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, LevelFilter};
use std::path::{Path, PathBuf};

use stockpeak_core::data::{LocalFileSource, RowSource};
use stockpeak_core::{find_peak, parse_rows};
use stockpeak_runner::{Pipeline, PipelineConfig, RunReport, SourceConfig};

#[derive(Parser)]
#[command(
    name = "stockpeak",
    about = "stockpeak — highest daily high from a price CSV"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline described by a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Source key, overriding the one in the config.
        #[arg(long)]
        key: Option<String>,

        /// Print the run report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the highest-high day of a local CSV file.
    Peak {
        /// CSV file with rows `date,close,volume,open,high,low`.
        path: PathBuf,

        /// Skip the first line.
        #[arg(long, default_value_t = false)]
        has_headers: bool,
    },
    /// Parse a local CSV file and print record count, date range and consistency.
    Inspect {
        /// CSV file with rows `date,close,volume,open,high,low`.
        path: PathBuf,

        /// Skip the first line.
        #[arg(long, default_value_t = false)]
        has_headers: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { config, key, json } => run_pipeline_cmd(&config, key, json),
        Commands::Peak { path, has_headers } => run_peak(&path, has_headers),
        Commands::Inspect { path, has_headers } => run_inspect(&path, has_headers),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run_pipeline_cmd(config_path: &Path, key: Option<String>, json: bool) -> Result<()> {
    let mut config = PipelineConfig::from_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(key) = key {
        config = config.with_key(key);
        config.validate()?;
    }
    debug!("config: {config:?}");

    let pipeline = Pipeline::from_config(&config)?;
    let report = pipeline.run(&config.key)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn run_peak(path: &Path, has_headers: bool) -> Result<()> {
    let mut config = PipelineConfig::local(path.display().to_string());
    config.source = SourceConfig::LocalFile {
        base_dir: None,
        has_headers,
    };

    let report = Pipeline::from_config(&config)?.run(&config.key)?;
    println!("{}", report.peak);
    Ok(())
}

fn run_inspect(path: &Path, has_headers: bool) -> Result<()> {
    let source = LocalFileSource::new().with_headers(has_headers);
    let key = path.display().to_string();
    let rows = source.fetch_rows(&key)?;
    let records = parse_rows(&rows).with_context(|| format!("parsing {key}"))?;

    let (Some(first), Some(last)) = (
        records.iter().map(|r| r.date).min(),
        records.iter().map(|r| r.date).max(),
    ) else {
        bail!("{key} contains no records");
    };
    let inconsistent = records.iter().filter(|r| !r.is_consistent()).count();
    let peak = find_peak(&records)?;

    println!("File:         {key}");
    println!("Records:      {}", records.len());
    println!("Date range:   {first} to {last}");
    println!("Inconsistent: {inconsistent}");
    println!("Peak:         {peak}");
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("Key:          {}", report.key);
    println!("Source:       {}", report.source);
    println!("Rows:         {}", report.row_count);
    println!("Peak date:    {}", report.peak.cache_key());
    println!("Peak high:    {}", report.peak.cache_value());
    if report.inconsistent_records > 0 {
        println!("Inconsistent: {}", report.inconsistent_records);
    }
    if report.sinks_written.is_empty() {
        println!("Sinks:        (none)");
    } else {
        println!("Sinks:        {}", report.sinks_written.join(", "));
    }
}
