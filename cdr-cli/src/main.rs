//! cdr-cli: rebuild logical calls from a CDR export
//!
//! Reads raw CDR legs (JSON array or JSON lines), rebuilds one call per
//! correlation group and writes the calls, and optionally their statistics,
//! as JSON reports.

use anyhow::{Context, Result};
use cdr_callflow::{
    parse_calldate, BatchDriver, BatchOptions, BatchReport, Breakdowns, CallStatistics,
    CancelHandle, CdrError, Directory, JsonFileLegSource, LegQuery, LegSource,
};
use chrono::NaiveDateTime;
use clap::Parser;
use colored::*;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

mod config;
mod summary;

use summary::Summary;

/// Rebuild calls from CDR legs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CDR export: JSON array or one JSON row per line
    #[arg(short, long)]
    legs: PathBuf,

    /// Directory payload (extensions and ring groups) as returned by the PBX API
    #[arg(short = 'D', long)]
    directory: Option<PathBuf>,

    /// Config file (default: <config dir>/cdr-callflow/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reference number; repeat for several. Overrides the config file
    #[arg(short, long = "reference")]
    reference: Vec<String>,

    /// Start of the period, inclusive
    #[arg(long)]
    from: Option<String>,

    /// End of the period, inclusive
    #[arg(long)]
    to: Option<String>,

    /// Keep only legs whose last application is Dial
    #[arg(long)]
    dial_only: bool,

    /// Worker threads
    #[arg(short, long)]
    workers: Option<usize>,

    /// Output directory for the JSON reports
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write call statistics
    #[arg(long)]
    stats: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

/// Contents of the statistics report
#[derive(Serialize)]
struct StatisticsReport<'a> {
    summary: &'a CallStatistics,
    #[serde(flatten)]
    breakdowns: Breakdowns,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.debug)?;

    let config = config::load(args.config.as_deref())?;
    let reference_numbers = if args
        .reference
        .is_empty()
    {
        config
            .analysis
            .reference_numbers
            .clone()
    } else {
        args.reference
            .clone()
    };

    let mut directory = match &args.directory {
        Some(path) => load_directory(path)?,
        None => Directory::default(),
    };
    directory
        .internal
        .extend(
            config
                .analysis
                .internal_numbers
                .iter()
                .cloned(),
        );
    if directory
        .internal
        .is_empty()
    {
        warn!("No internal endpoints known, every call will be treated as external");
    }

    let from = args
        .from
        .as_deref()
        .map(parse_calldate)
        .transpose()
        .context("Invalid --from date")?;
    let to = args
        .to
        .as_deref()
        .map(parse_calldate)
        .transpose()
        .context("Invalid --to date")?;
    let query = LegQuery {
        from,
        to,
        numbers: reference_numbers.clone(),
        dial_only: args.dial_only,
    };

    let source = JsonFileLegSource::new(&args.legs);
    let legs = source
        .fetch(&query)
        .with_context(|| format!("Failed to read legs from {:?}", args.legs))?;
    info!("{} legs selected", legs.len());
    let period = period_label(
        from,
        to,
        legs.iter()
            .map(|leg| leg.timestamp),
    );

    let context = directory.context(reference_numbers.iter().cloned());
    let cancel = CancelHandle::new();
    let mut options = BatchOptions::default().with_cancel(cancel.clone());
    if let Some(workers) = args
        .workers
        .or(config.batch.workers)
    {
        options = options.with_workers(workers);
    }

    let task = tokio::task::spawn_blocking(move || {
        BatchDriver::new(&context, options).run(legs)
    });
    let joined = await_batch(task, tokio::signal::ctrl_c(), &cancel).await;

    let report = match joined.context("Batch task failed")? {
        Ok(report) => report,
        Err(CdrError::Cancelled { completed, total }) => {
            let message = format!("Cancelled after {} of {} groups", completed, total);
            if args.no_color {
                eprintln!("{}", message);
            } else {
                eprintln!("{}", message.yellow());
            }
            std::process::exit(130);
        }
        Err(e) => return Err(e.into()),
    };

    let output_dir = args
        .output
        .clone()
        .or(config.output.directory)
        .unwrap_or_else(|| PathBuf::from("./output"));
    write_reports(&args, &report, &reference_numbers, &directory, &output_dir, &period)
}

/// Wait for the batch, cancelling it on interrupt. If the interrupt cannot
/// be listened for, the batch runs to completion.
async fn await_batch<T>(
    mut task: tokio::task::JoinHandle<T>,
    interrupt: impl std::future::Future<Output = std::io::Result<()>>,
    cancel: &CancelHandle,
) -> Result<T, tokio::task::JoinError> {
    tokio::select! {
        joined = &mut task => joined,
        signal = interrupt => {
            match signal {
                Ok(()) => {
                    warn!("Interrupted, abandoning remaining groups");
                    cancel.cancel();
                }
                Err(e) => warn!("Cannot listen for Ctrl-C, batch will run to completion: {}", e),
            }
            task.await
        }
    }
}

/// Set up logging based on debug level, `RUST_LOG` taking precedence
fn setup_logging(debug: bool) -> Result<()> {
    let filter = if debug { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}

fn load_directory(path: &Path) -> Result<Directory> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read directory file: {:?}", path))?;
    Directory::from_json_str(&contents)
        .with_context(|| format!("Invalid directory file: {:?}", path))
}

/// `YYYYMMDD-YYYYMMDD`, open bounds taken from the legs themselves.
fn period_label(
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
    timestamps: impl Iterator<Item = NaiveDateTime> + Clone,
) -> String {
    let from = from.or_else(|| {
        timestamps
            .clone()
            .min()
    });
    let to = to.or_else(|| timestamps.max());
    match (from, to) {
        (Some(from), Some(to)) => format!("{}-{}", from.format("%Y%m%d"), to.format("%Y%m%d")),
        _ => "empty".to_string(),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

fn write_reports(
    args: &Args,
    report: &BatchReport,
    reference_numbers: &[String],
    directory: &Directory,
    output_dir: &Path,
    period: &str,
) -> Result<()> {
    let summary = Summary::new(args.no_color);
    summary.batch(report);

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let mut calls = report
        .calls
        .clone();
    calls.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| {
                a.correlation_id
                    .cmp(&b.correlation_id)
            })
    });

    let calls_path = output_dir.join(format!("calls_{}.json", period));
    write_json(&calls_path, &calls)?;
    summary.written(&calls_path);

    if args.stats {
        let statistics = CallStatistics::from_calls(&calls, reference_numbers);
        summary.statistics(&statistics);
        let stats_path = output_dir.join(format!("stats_calls_{}.json", period));
        write_json(
            &stats_path,
            &StatisticsReport {
                summary: &statistics,
                breakdowns: Breakdowns::of(&calls, 10),
            },
        )?;
        summary.written(&stats_path);
    }

    summary.busiest(report, directory, 5);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_from_bounds_or_legs() {
        let at = |s: &str| parse_calldate(s).unwrap();
        assert_eq!(
            period_label(
                Some(at("2025-05-01")),
                Some(at("2025-05-31 23:59:59")),
                std::iter::empty()
            ),
            "20250501-20250531"
        );
        let seen = vec![at("2025-05-03 10:00:00"), at("2025-05-02 09:00:00")];
        assert_eq!(
            period_label(None, None, seen.into_iter()),
            "20250502-20250503"
        );
        assert_eq!(period_label(None, None, std::iter::empty()), "empty");
    }

    #[tokio::test]
    async fn interrupt_cancels_batch() {
        let cancel = CancelHandle::new();
        let watched = cancel.clone();
        let task = tokio::task::spawn_blocking(move || {
            while !watched.is_cancelled() {
                std::thread::sleep(std::time::Duration::from_millis(5));
            }
            "stopped"
        });
        let joined = await_batch(task, async { Ok::<(), std::io::Error>(()) }, &cancel).await;
        assert_eq!(joined.unwrap(), "stopped");
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn interrupt_listener_failure_lets_batch_finish() {
        let cancel = CancelHandle::new();
        let task = tokio::task::spawn_blocking(|| {
            std::thread::sleep(std::time::Duration::from_millis(20));
            "done"
        });
        let failed = async { Err(std::io::Error::new(std::io::ErrorKind::Other, "no signal")) };
        let joined = await_batch(task, failed, &cancel).await;
        assert_eq!(joined.unwrap(), "done");
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn args_parse() {
        let args = Args::try_parse_from([
            "cdr-cli",
            "--legs",
            "cdr.json",
            "-r",
            "0601020304",
            "--reference",
            "0102030405",
            "--stats",
        ])
        .unwrap();
        assert_eq!(args.reference, vec!["0601020304", "0102030405"]);
        assert!(args.stats);
        assert!(args
            .workers
            .is_none());
    }
}
