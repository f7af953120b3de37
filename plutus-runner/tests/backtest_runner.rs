//! Integration tests for the orchestrator: scripted providers on
//! hand-crafted candle fixtures, pinning the engine's observable behavior.

use chrono::{DateTime, Duration, TimeZone, Utc};

use plutus_core::domain::{Candlestick, Direction, Prediction};
use plutus_core::feed::CandleSeries;
use plutus_core::predictor::{PredictionError, PredictionProvider};
use plutus_runner::config::{BacktestConfig, ModelConfig};
use plutus_runner::progress::SilentProgress;
use plutus_runner::runner::{run_backtest, RunError};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 3, 1, 0, 0, 0).unwrap()
}

fn candle(minute: i64, open: f64, high: f64, low: f64, close: f64) -> Candlestick {
    let ot = base_time() + Duration::minutes(minute);
    Candlestick {
        open_time: ot,
        close_time: ot + Duration::minutes(1),
        open,
        high,
        low,
        close,
        volume: 1.0,
    }
}

/// Flat filler candle that triggers no exits for 1% thresholds around 100.
fn flat(minute: i64) -> Candlestick {
    candle(minute, 100.0, 100.3, 99.7, 100.0)
}

fn config_with_models(models: Vec<ModelConfig>) -> BacktestConfig {
    BacktestConfig {
        id: "unit_test".into(),
        description: "orchestrator integration fixtures".into(),
        start: None,
        end: None,
        take_profit: 1.0,
        stop_loss: 1.0,
        idle_minutes_on_position_close: 30,
        models,
    }
}

fn model(id: &str) -> ModelConfig {
    ModelConfig {
        id: id.into(),
        kind: "scripted".into(),
        lookback: 4,
        params: serde_json::Value::Null,
    }
}

/// Provider scripted by call order; neutral once the script runs out.
struct Scripted {
    script: Vec<Direction>,
    cursor: usize,
}

impl Scripted {
    fn boxed(script: Vec<Direction>) -> Box<dyn PredictionProvider> {
        Box::new(Self { script, cursor: 0 })
    }
}

impl PredictionProvider for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn predict(
        &mut self,
        at: DateTime<Utc>,
        _lookback: &[Candlestick],
    ) -> Result<Prediction, PredictionError> {
        let direction = self
            .script
            .get(self.cursor)
            .copied()
            .unwrap_or(Direction::Neutral);
        self.cursor += 1;
        Ok(Prediction::new(direction, at))
    }
}

/// Provider that fails at a specific timestamp.
struct FailsAt {
    at: DateTime<Utc>,
}

impl PredictionProvider for FailsAt {
    fn name(&self) -> &str {
        "fails_at"
    }

    fn predict(
        &mut self,
        at: DateTime<Utc>,
        _lookback: &[Candlestick],
    ) -> Result<Prediction, PredictionError> {
        if at >= self.at {
            Err(PredictionError::Provider("model server gone".into()))
        } else {
            Ok(Prediction::new(Direction::Neutral, at))
        }
    }
}

#[test]
fn long_take_profit_scores_one_point() {
    // Open long at 100 (tpp 101, slp 99); next candle tags 101.2.
    let feed = CandleSeries::new(vec![
        candle(0, 100.0, 100.4, 99.8, 100.1),
        candle(1, 100.5, 101.2, 100.5, 101.0),
        flat(2),
    ])
    .unwrap();
    let config = config_with_models(vec![model("long_winner")]);
    let mut providers = vec![Scripted::boxed(vec![Direction::Long])];

    let results = run_backtest(&config, &feed, &mut providers, &SilentProgress).unwrap();
    assert_eq!(results.len(), 1);
    let perf = &results[0].performance;
    assert_eq!(perf.positions.len(), 1);
    assert_eq!(perf.points, 1.0);
    assert_eq!(perf.points_hist, vec![1.0]);
    assert_eq!(perf.general_acc, 1.0);
    assert_eq!(perf.long_num, 1);
    assert_eq!(perf.long_wins, 1);
    assert!(perf.positions[0].outcome);
    assert_eq!(perf.positions[0].close_price, 101.0);
}

#[test]
fn long_stop_loss_scores_minus_one() {
    let feed = CandleSeries::new(vec![
        candle(0, 100.0, 100.4, 99.8, 100.1),
        candle(1, 100.0, 100.2, 98.7, 99.2),
        flat(2),
    ])
    .unwrap();
    let config = config_with_models(vec![model("long_loser")]);
    let mut providers = vec![Scripted::boxed(vec![Direction::Long])];

    let results = run_backtest(&config, &feed, &mut providers, &SilentProgress).unwrap();
    let perf = &results[0].performance;
    assert_eq!(perf.points, -1.0);
    assert_eq!(perf.general_acc, 0.0);
    assert!(!perf.positions[0].outcome);
    assert_eq!(perf.positions[0].close_price, 99.0);
}

#[test]
fn candle_crossing_both_thresholds_closes_as_loss() {
    // high 101.5 and low 98.5 cross both exit prices; the stop-loss is
    // evaluated first, so the outcome is deterministic.
    let feed = CandleSeries::new(vec![
        candle(0, 100.0, 100.4, 99.8, 100.1),
        candle(1, 100.0, 101.5, 98.5, 100.0),
        flat(2),
    ])
    .unwrap();
    let config = config_with_models(vec![model("wild_candle")]);
    let mut providers = vec![Scripted::boxed(vec![Direction::Long])];

    let results = run_backtest(&config, &feed, &mut providers, &SilentProgress).unwrap();
    let perf = &results[0].performance;
    assert_eq!(perf.positions.len(), 1);
    assert!(!perf.positions[0].outcome);
    assert_eq!(perf.points, -1.0);
}

#[test]
fn all_neutral_leaves_the_record_empty() {
    let candles: Vec<_> = (0..50).map(flat).collect();
    let feed = CandleSeries::new(candles).unwrap();
    let config = config_with_models(vec![model("sleeper")]);
    let mut providers = vec![Scripted::boxed(vec![])];

    let results = run_backtest(&config, &feed, &mut providers, &SilentProgress).unwrap();
    let perf = &results[0].performance;
    assert!(perf.positions.is_empty());
    assert!(perf.points_hist.is_empty());
    assert_eq!(perf.points, 0.0);
    assert_eq!(perf.general_acc, 0.0);
    assert_eq!(perf.points_median, 0.0);
}

#[test]
fn cooldown_gates_reentry_across_the_replay() {
    // Close at minute 1 (ct = minute 2), idle 30 => no entry before minute 32.
    let mut candles = vec![
        candle(0, 100.0, 100.4, 99.8, 100.1),
        candle(1, 100.5, 101.2, 100.5, 101.0), // take profit
    ];
    for minute in 2..40 {
        candles.push(flat(minute));
    }
    let feed = CandleSeries::new(candles).unwrap();
    let config = config_with_models(vec![model("cooldown")]);
    // Every call answers Long: if the cooldown leaked, a second position
    // would open (and close) well before minute 32.
    let mut providers = vec![Scripted::boxed(vec![Direction::Long; 64])];

    let results = run_backtest(&config, &feed, &mut providers, &SilentProgress).unwrap();
    let perf = &results[0].performance;
    assert_eq!(perf.positions.len(), 1);

    // The second position (opened at minute 32) never closes on the flat
    // tail, so only the first appears; had it closed, its open time would
    // still have to respect the idle window.
    let first = &perf.positions[0];
    assert_eq!(first.close_time, base_time() + Duration::minutes(2));
}

#[test]
fn position_open_at_feed_end_is_excluded() {
    // A long opens at minute 0 and nothing ever hits 101 or 99.
    let candles: Vec<_> = (0..10).map(flat).collect();
    let feed = CandleSeries::new(candles).unwrap();
    let config = config_with_models(vec![model("stuck_open")]);
    let mut providers = vec![Scripted::boxed(vec![Direction::Long])];

    let results = run_backtest(&config, &feed, &mut providers, &SilentProgress).unwrap();
    let perf = &results[0].performance;
    assert!(perf.positions.is_empty());
    assert_eq!(perf.points, 0.0);
    assert_eq!(perf.positions.len(), perf.points_hist.len());
}

#[test]
fn range_with_no_candles_yields_zero_position_results() {
    let feed = CandleSeries::new((0..10).map(flat).collect()).unwrap();
    let mut config = config_with_models(vec![model("gap_a"), model("gap_b")]);
    // A window inside the feed bounds that contains no open times.
    config.start = Some(base_time() + Duration::seconds(15));
    config.end = Some(base_time() + Duration::seconds(45));

    let mut providers = vec![
        Scripted::boxed(vec![Direction::Long]),
        Scripted::boxed(vec![Direction::Short]),
    ];
    let results = run_backtest(&config, &feed, &mut providers, &SilentProgress).unwrap();
    assert_eq!(results.len(), 2);
    for result in &results {
        assert!(result.performance.positions.is_empty());
        assert_eq!(result.performance.points, 0.0);
    }
}

#[test]
fn range_outside_feed_fails_fast() {
    let feed = CandleSeries::new((0..10).map(flat).collect()).unwrap();
    let mut config = config_with_models(vec![model("m")]);
    config.start = Some(base_time() + Duration::days(30));
    let mut providers = vec![Scripted::boxed(vec![])];

    let err = run_backtest(&config, &feed, &mut providers, &SilentProgress).unwrap_err();
    assert!(matches!(err, RunError::RangeOutsideFeed { .. }));
}

#[test]
fn empty_feed_is_an_error() {
    let feed = CandleSeries::new(Vec::new()).unwrap();
    let config = config_with_models(vec![model("m")]);
    let mut providers = vec![Scripted::boxed(vec![])];

    let err = run_backtest(&config, &feed, &mut providers, &SilentProgress).unwrap_err();
    assert!(matches!(err, RunError::EmptyFeed));
}

#[test]
fn prediction_failure_aborts_the_whole_run() {
    let feed = CandleSeries::new((0..10).map(flat).collect()).unwrap();
    let config = config_with_models(vec![model("ok"), model("doomed")]);
    let failure_at = base_time() + Duration::minutes(5);
    let mut providers: Vec<Box<dyn PredictionProvider>> = vec![
        Scripted::boxed(vec![]),
        Box::new(FailsAt { at: failure_at }),
    ];

    let err = run_backtest(&config, &feed, &mut providers, &SilentProgress).unwrap_err();
    match err {
        RunError::Prediction { model, at, .. } => {
            assert_eq!(model, "doomed");
            assert_eq!(at, failure_at);
        }
        other => panic!("expected Prediction error, got {other}"),
    }
}

#[test]
fn provider_count_must_match_model_count() {
    let feed = CandleSeries::new((0..5).map(flat).collect()).unwrap();
    let config = config_with_models(vec![model("a"), model("b")]);
    let mut providers = vec![Scripted::boxed(vec![])];

    let err = run_backtest(&config, &feed, &mut providers, &SilentProgress).unwrap_err();
    assert!(matches!(
        err,
        RunError::ProviderMismatch {
            expected: 2,
            got: 1
        }
    ));
}

#[test]
fn replay_is_deterministic_for_deterministic_providers() {
    let mut candles = vec![
        candle(0, 100.0, 100.4, 99.8, 100.1),
        candle(1, 100.5, 101.2, 100.5, 101.0),
    ];
    for minute in 2..80 {
        candles.push(flat(minute));
    }
    // A second trade after the cooldown, this one a loss.
    candles.push(candle(80, 100.0, 100.4, 99.8, 100.1));
    candles.push(candle(81, 100.0, 100.2, 98.7, 99.1));
    candles.push(flat(82));
    let feed = CandleSeries::new(candles).unwrap();
    let config = config_with_models(vec![model("det")]);
    let script = vec![Direction::Long; 128];

    let run = |feed: &CandleSeries| {
        let mut providers = vec![Scripted::boxed(script.clone())];
        run_backtest(&config, feed, &mut providers, &SilentProgress).unwrap()
    };
    let first = run(&feed);
    let second = run(&feed);

    // Everything except the wall-clock timing sidecar is identical across
    // replays: the snapshot, the model identity, the full performance
    // record and the config hash.
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.backtest, b.backtest);
        assert_eq!(a.model, b.model);
        assert_eq!(a.performance, b.performance);
        assert_eq!(a.config_hash, b.config_hash);
        assert_eq!(
            serde_json::to_string(&a.performance).unwrap(),
            serde_json::to_string(&b.performance).unwrap()
        );
    }

    let perf = &first[0].performance;
    assert_eq!(perf.positions.len(), 2);
    assert_eq!(perf.points_hist, vec![1.0, 0.0]);
    assert_eq!(perf.general_acc, 0.5);
    assert_eq!(perf.points_median, 0.5);
}

#[test]
fn models_are_replayed_in_list_order_with_isolated_state() {
    let mut candles = vec![
        candle(0, 100.0, 100.4, 99.8, 100.1),
        candle(1, 100.5, 101.2, 100.5, 101.0),
    ];
    for minute in 2..10 {
        candles.push(flat(minute));
    }
    let feed = CandleSeries::new(candles).unwrap();
    let config = config_with_models(vec![model("winner"), model("idle")]);
    let mut providers = vec![
        Scripted::boxed(vec![Direction::Long]),
        Scripted::boxed(vec![]),
    ];

    let results = run_backtest(&config, &feed, &mut providers, &SilentProgress).unwrap();
    assert_eq!(results[0].model.id, "winner");
    assert_eq!(results[1].model.id, "idle");
    assert_eq!(results[0].performance.positions.len(), 1);
    // The second model's accumulator saw nothing from the first replay.
    assert!(results[1].performance.positions.is_empty());
    // Both snapshots carry the same covered range and config hash.
    assert_eq!(results[0].backtest.start, results[1].backtest.start);
    assert_eq!(results[0].config_hash, results[1].config_hash);
}
