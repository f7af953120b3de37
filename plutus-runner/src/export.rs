//! Result export — JSON batches and CSV tapes.
//!
//! The batch file is the durable output of a run: one JSON document holding
//! every model's result, sorted by final points, written in a single call
//! only after all models have completed. CSV exports exist for external
//! analysis tools.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};

use plutus_core::domain::{ClosedPosition, PositionSide};

use crate::runner::{ModelResult, SCHEMA_VERSION};

// ─── JSON batch ─────────────────────────────────────────────────────

/// Serialize a result batch to pretty JSON.
pub fn export_json(results: &[ModelResult]) -> Result<String> {
    serde_json::to_string_pretty(results).context("failed to serialize results to JSON")
}

/// Deserialize a result batch, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<Vec<ModelResult>> {
    let results: Vec<ModelResult> =
        serde_json::from_str(json).context("failed to deserialize results from JSON")?;
    for result in &results {
        if result.schema_version > SCHEMA_VERSION {
            bail!(
                "unsupported schema version {} (max supported: {})",
                result.schema_version,
                SCHEMA_VERSION
            );
        }
    }
    Ok(results)
}

/// Batch file name: `{backtest_id}_{completion_ms}.json`.
pub fn result_file_name(backtest_id: &str, completed_at: DateTime<Utc>) -> String {
    format!("{backtest_id}_{}.json", completed_at.timestamp_millis())
}

/// Persist a completed run under `output_dir`.
///
/// Results are sorted by final points descending (ties broken by model id
/// for a stable order) and written once: the batch either exists in full or
/// not at all. Returns the written path.
pub fn save_results(results: &mut [ModelResult], output_dir: &Path) -> Result<PathBuf> {
    sort_by_points(results);

    let backtest_id = results
        .first()
        .map(|r| r.backtest.id.as_str())
        .unwrap_or("empty");
    let path = output_dir.join(result_file_name(backtest_id, Utc::now()));
    let json = export_json(results)?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir {}", output_dir.display()))?;
    std::fs::write(&path, json)
        .with_context(|| format!("failed to write results to {}", path.display()))?;
    Ok(path)
}

/// Sort results by final points, best first.
pub fn sort_by_points(results: &mut [ModelResult]) {
    results.sort_by(|a, b| {
        b.performance
            .points
            .partial_cmp(&a.performance.points)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.model.id.cmp(&b.model.id))
    });
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a model's closed-position tape as CSV.
///
/// Columns: side, open_time, open_price, take_profit_price, stop_loss_price,
/// close_time, close_price, outcome, points
pub fn export_positions_csv(positions: &[ClosedPosition]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "side",
        "open_time",
        "open_price",
        "take_profit_price",
        "stop_loss_price",
        "close_time",
        "close_price",
        "outcome",
        "points",
    ])?;

    for p in positions {
        let side = match p.side {
            PositionSide::Long => "long",
            PositionSide::Short => "short",
        };
        wtr.write_record([
            side,
            &p.open_time.to_rfc3339(),
            &format!("{:.8}", p.open_price),
            &format!("{:.8}", p.take_profit_price),
            &format!("{:.8}", p.stop_loss_price),
            &p.close_time.to_rfc3339(),
            &format!("{:.8}", p.close_price),
            &p.outcome.to_string(),
            &format!("{:.2}", p.points),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export a points history as CSV with position_index and points columns.
pub fn export_points_csv(points_hist: &[f64]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["position_index", "points"])?;
    for (i, pts) in points_hist.iter().enumerate() {
        wtr.write_record([&i.to_string(), &format!("{:.2}", pts)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}
