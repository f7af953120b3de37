//! Plutus Runner — backtest orchestration and result artifacts.
//!
//! This crate builds on `plutus-core` to provide:
//! - Backtest configuration loading and fail-fast validation
//! - CSV candle loading and seeded synthetic data generation
//! - The sequential per-model orchestrator
//! - Result export: sorted JSON batches plus CSV tapes

pub mod config;
pub mod data_loader;
pub mod export;
pub mod progress;
pub mod runner;
pub mod synthetic;

pub use config::{BacktestConfig, ConfigError, ModelConfig};
pub use data_loader::{load_candles_csv, write_candles_csv, LoadError};
pub use export::{export_json, import_json, save_results};
pub use progress::{ReplayProgress, SilentProgress, StdoutProgress};
pub use runner::{run_backtest, BacktestSnapshot, ModelResult, ReplayTiming, RunError, SCHEMA_VERSION};
