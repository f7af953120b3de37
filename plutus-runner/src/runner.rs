//! Backtest orchestrator — one full candle replay per model, sequentially.
//!
//! Models are replayed strictly in list order, never in parallel: progress
//! reporting stays deterministic and only one lookback window is live at a
//! time. Each model gets a fresh `PositionManager`/`PerformanceAccumulator`
//! pair, so nothing mutable is shared between replays.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use plutus_core::feed::CandleSeries;
use plutus_core::performance::{PerformanceAccumulator, PerformanceRecord};
use plutus_core::position_management::PositionManager;
use plutus_core::predictor::{PredictionError, PredictionProvider};

use crate::config::{BacktestConfig, ConfigError, ModelConfig};
use crate::progress::ReplayProgress;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from the orchestrator.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("candle feed is empty")]
    EmptyFeed,

    #[error("requested range does not overlap the feed ({feed_start}..{feed_end})")]
    RangeOutsideFeed {
        feed_start: DateTime<Utc>,
        feed_end: DateTime<Utc>,
    },

    #[error("expected {expected} providers (one per model), got {got}")]
    ProviderMismatch { expected: usize, got: usize },

    #[error("model '{model}' prediction failed at {at}: {source}")]
    Prediction {
        model: String,
        at: DateTime<Utc>,
        #[source]
        source: PredictionError,
    },
}

/// Configuration snapshot embedded in every model result.
///
/// Fully determined by the config and the feed: two replays of the same
/// range with the same config produce identical snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSnapshot {
    pub id: String,
    pub description: String,
    /// Open time of the first candle actually covered.
    pub start: DateTime<Utc>,
    /// Close time of the last candle actually covered.
    pub end: DateTime<Utc>,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub idle_minutes_on_position_close: u32,
}

/// Wall-clock timing of one model's replay.
///
/// Kept apart from the snapshot: timing varies between replays and is not
/// part of the result's deterministic content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayTiming {
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub duration_minutes: i64,
}

/// One model's complete backtest result.
///
/// Persisted as part of a batch; `schema_version` gates deserialization of
/// older artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub backtest: BacktestSnapshot,
    pub model: ModelConfig,
    pub performance: PerformanceRecord,
    pub timing: ReplayTiming,
    /// blake3 hash of the originating configuration.
    pub config_hash: String,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run a full backtest: every model in `config.models`, in order, against
/// the resolved candle range.
///
/// `providers` must align one-to-one with `config.models`. A prediction
/// failure aborts the entire run — results for models that already finished
/// are discarded and nothing is persisted, so a failed run never emits
/// partial output. An otherwise valid range that contains no candles yields
/// one zero-position result per model.
pub fn run_backtest(
    config: &BacktestConfig,
    feed: &CandleSeries,
    providers: &mut [Box<dyn PredictionProvider>],
    progress: &dyn ReplayProgress,
) -> Result<Vec<ModelResult>, RunError> {
    config.validate()?;
    if providers.len() != config.models.len() {
        return Err(RunError::ProviderMismatch {
            expected: config.models.len(),
            got: providers.len(),
        });
    }

    let (feed_start, feed_end) = match (feed.earliest(), feed.latest()) {
        (Some(s), Some(e)) => (s, e),
        _ => return Err(RunError::EmptyFeed),
    };
    // Fail fast if the requested window cannot overlap the feed at all.
    if config.start.map_or(false, |s| s > feed_end) || config.end.map_or(false, |e| e < feed_start)
    {
        return Err(RunError::RangeOutsideFeed {
            feed_start,
            feed_end,
        });
    }

    let candles = feed.range(config.start, config.end);
    // Covered bounds for the result snapshot; an empty range (a gap in the
    // data) still produces results, just with zero positions.
    let covered_start = candles.first().map(|c| c.open_time).unwrap_or(feed_start);
    let covered_end = candles.last().map(|c| c.close_time).unwrap_or(feed_end);

    let config_hash = config.config_hash();
    let run_started = std::time::Instant::now();
    let total = config.models.len();
    let mut results = Vec::with_capacity(total);

    for (index, (model, provider)) in config.models.iter().zip(providers.iter_mut()).enumerate() {
        progress.on_model_start(&model.id, index, total);
        let model_start = Utc::now();

        let performance = replay_model(config, model, candles, feed, provider.as_mut())?;

        let model_end = Utc::now();
        progress.on_model_complete(
            &model.id,
            index,
            total,
            performance.points,
            performance.positions.len(),
        );

        results.push(ModelResult {
            schema_version: SCHEMA_VERSION,
            backtest: BacktestSnapshot {
                id: config.id.clone(),
                description: config.description.clone(),
                start: covered_start,
                end: covered_end,
                take_profit: config.take_profit,
                stop_loss: config.stop_loss,
                idle_minutes_on_position_close: config.idle_minutes_on_position_close,
            },
            model: model.clone(),
            performance,
            timing: ReplayTiming {
                started: model_start,
                finished: model_end,
                duration_minutes: (model_end - model_start).num_minutes(),
            },
            config_hash: config_hash.clone(),
        });
    }

    progress.on_run_complete(total, run_started.elapsed());
    Ok(results)
}

/// Replay the candle range for one model with fresh state.
fn replay_model(
    config: &BacktestConfig,
    model: &ModelConfig,
    candles: &[plutus_core::domain::Candlestick],
    feed: &CandleSeries,
    provider: &mut dyn PredictionProvider,
) -> Result<PerformanceRecord, RunError> {
    let mut manager = PositionManager::new(
        config.take_profit,
        config.stop_loss,
        config.idle_minutes_on_position_close,
    );
    let mut accumulator = PerformanceAccumulator::new();
    let last_index = candles.len().saturating_sub(1);

    for (i, candle) in candles.iter().enumerate() {
        let lookback = feed.lookback(model.lookback, candle.open_time);
        let closed = manager
            .advance(candle, lookback, provider, i == last_index)
            .map_err(|source| RunError::Prediction {
                model: model.id.clone(),
                at: candle.open_time,
                source,
            })?;
        if let Some(closed) = closed {
            accumulator.record(closed);
        }
    }

    // A position still open here is discarded: it is never force-closed and
    // never appears in the record.
    Ok(accumulator.finalize())
}
