//! Plutus CLI — generate, run, and inspect commands.
//!
//! Commands:
//! - `generate` — write a seeded synthetic candle feed as CSV
//! - `run` — execute a backtest from a TOML config against a candle CSV
//! - `inspect` — summarize a persisted result batch

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};

use plutus_core::predictor::{PredictionProvider, ProviderRegistry};
use plutus_runner::export::save_results;
use plutus_runner::progress::StdoutProgress;
use plutus_runner::runner::{run_backtest, ModelResult};
use plutus_runner::synthetic::synthetic_candles;
use plutus_runner::{import_json, load_candles_csv, write_candles_csv, BacktestConfig};

#[derive(Parser)]
#[command(name = "plutus", about = "Plutus CLI — candle replay backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a seeded synthetic candle feed as CSV.
    Generate {
        /// Number of candles to generate.
        #[arg(long, default_value_t = 10_000)]
        count: usize,

        /// Feed start time (RFC 3339, e.g. 2022-03-01T00:00:00Z).
        #[arg(long, default_value = "2022-01-01T00:00:00Z")]
        start: String,

        /// Candle interval in minutes.
        #[arg(long, default_value_t = 1)]
        interval_minutes: u32,

        /// RNG seed: the same seed always yields the same feed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Price of the first candle's open.
        #[arg(long, default_value_t = 100.0)]
        start_price: f64,

        /// Output CSV path.
        #[arg(long, default_value = "candles.csv")]
        output: PathBuf,
    },
    /// Execute a backtest from a TOML config file against a candle CSV.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Path to the candle feed CSV.
        #[arg(long)]
        data: PathBuf,

        /// Output directory for the result batch JSON.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Summarize a persisted result batch.
    Inspect {
        /// Path to a result batch JSON file.
        file: PathBuf,

        /// Emit the summary as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            count,
            start,
            interval_minutes,
            seed,
            start_price,
            output,
        } => run_generate(count, &start, interval_minutes, seed, start_price, &output),
        Commands::Run {
            config,
            data,
            output_dir,
        } => run_backtest_cmd(&config, &data, &output_dir),
        Commands::Inspect { file, json } => run_inspect(&file, json),
    }
}

fn run_generate(
    count: usize,
    start: &str,
    interval_minutes: u32,
    seed: u64,
    start_price: f64,
    output: &Path,
) -> Result<()> {
    let start = parse_time(start)?;
    let candles = synthetic_candles(count, start, interval_minutes, seed, start_price);
    write_candles_csv(output, &candles)?;
    println!(
        "Wrote {count} candles ({interval_minutes}m, seed {seed}) to {}",
        output.display()
    );
    Ok(())
}

fn run_backtest_cmd(config_path: &Path, data_path: &Path, output_dir: &Path) -> Result<()> {
    let config = BacktestConfig::from_toml_file(config_path)?;
    let feed = load_candles_csv(data_path)
        .with_context(|| format!("failed to load candles from {}", data_path.display()))?;

    let registry = ProviderRegistry::with_defaults();
    let mut providers: Vec<Box<dyn PredictionProvider>> = Vec::with_capacity(config.models.len());
    for model in &config.models {
        match registry.create(&model.kind, &model.params) {
            Some(provider) => providers.push(provider),
            None => bail!(
                "model '{}': unknown provider kind '{}'. Valid: {}",
                model.id,
                model.kind,
                registry.kinds().join(", ")
            ),
        }
    }

    let mut results = run_backtest(&config, &feed, &mut providers, &StdoutProgress)?;
    print_summary(&results);

    let path = save_results(&mut results, output_dir)?;
    println!("Results saved to: {}", path.display());
    Ok(())
}

fn run_inspect(file: &Path, as_json: bool) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let results = import_json(&raw)?;

    if as_json {
        println!("{}", summary_json(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("Empty result batch: {}", file.display());
        return Ok(());
    }

    let snapshot = &results[0].backtest;
    println!("Backtest:       {}", snapshot.id);
    if !snapshot.description.is_empty() {
        println!("Description:    {}", snapshot.description);
    }
    println!("Covered range:  {} to {}", snapshot.start, snapshot.end);
    println!(
        "Thresholds:     +{}% / -{}%, idle {}m",
        snapshot.take_profit, snapshot.stop_loss, snapshot.idle_minutes_on_position_close
    );
    println!("Models:         {}", results.len());
    print_summary(&results);
    Ok(())
}

/// One JSON object per model, in batch order, for scripting on top of
/// `inspect` without parsing the full result file.
fn summary_json(results: &[ModelResult]) -> Result<String> {
    let summaries: Vec<serde_json::Value> = results
        .iter()
        .map(|result| {
            let perf = &result.performance;
            serde_json::json!({
                "model": result.model.id,
                "points": perf.points,
                "points_median": perf.points_median,
                "positions": perf.positions.len(),
                "long_acc": perf.long_acc,
                "short_acc": perf.short_acc,
                "general_acc": perf.general_acc,
            })
        })
        .collect();
    serde_json::to_string_pretty(&summaries).context("failed to serialize summary")
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    // Bare dates are accepted as midnight UTC.
    if let Ok(d) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }
    bail!("invalid time '{raw}': expected RFC 3339 or YYYY-MM-DD")
}


fn print_summary(results: &[ModelResult]) {
    println!();
    println!(
        "{:<20} {:>10} {:>10} {:>8} {:>8} {:>8} {:>8}",
        "Model", "Points", "Median", "Trades", "Long%", "Short%", "Acc%"
    );
    println!("{}", "-".repeat(78));
    for result in results {
        let perf = &result.performance;
        println!(
            "{:<20} {:>10.2} {:>10.2} {:>8} {:>8.1} {:>8.1} {:>8.1}",
            result.model.id,
            perf.points,
            perf.points_median,
            perf.positions.len(),
            perf.long_acc * 100.0,
            perf.short_acc * 100.0,
            perf.general_acc * 100.0,
        );
    }
    println!();
}
