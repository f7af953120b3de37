//! Progress reporting for multi-model replays.
//!
//! The orchestrator reports through a callback trait so the CLI can print
//! and library callers (or tests) can stay silent. Models are replayed
//! strictly sequentially, so callbacks arrive in a deterministic order.

use std::time::Duration;

/// Progress callbacks for one backtest run.
pub trait ReplayProgress: Send {
    /// Called before a model's replay starts.
    fn on_model_start(&self, model_id: &str, index: usize, total: usize);

    /// Called when a model's replay completes.
    fn on_model_complete(
        &self,
        model_id: &str,
        index: usize,
        total: usize,
        points: f64,
        closed_positions: usize,
    );

    /// Called once every model has completed.
    fn on_run_complete(&self, total: usize, elapsed: Duration);
}

/// Prints progress to stdout.
pub struct StdoutProgress;

impl ReplayProgress for StdoutProgress {
    fn on_model_start(&self, model_id: &str, index: usize, total: usize) {
        println!("[{}/{}] Replaying {model_id}...", index + 1, total);
    }

    fn on_model_complete(
        &self,
        model_id: &str,
        _index: usize,
        _total: usize,
        points: f64,
        closed_positions: usize,
    ) {
        println!("  done: {model_id}: {points:.2} pts over {closed_positions} positions");
    }

    fn on_run_complete(&self, total: usize, elapsed: Duration) {
        println!("\nBacktest complete: {total} models in {:.1}s", elapsed.as_secs_f64());
    }
}

/// No-op reporter for library use and tests.
pub struct SilentProgress;

impl ReplayProgress for SilentProgress {
    fn on_model_start(&self, _model_id: &str, _index: usize, _total: usize) {}

    fn on_model_complete(
        &self,
        _model_id: &str,
        _index: usize,
        _total: usize,
        _points: f64,
        _closed_positions: usize,
    ) {
    }

    fn on_run_complete(&self, _total: usize, _elapsed: Duration) {}
}
