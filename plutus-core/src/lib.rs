//! Plutus Core — engine, domain types, candle feed, position management.
//!
//! This crate contains the heart of the backtesting engine:
//! - Domain types (candlesticks, predictions, open/closed positions)
//! - Validated in-memory candle feed with range and lookback access
//! - Prediction provider seam (the engine never branches on model kind)
//! - Per-model position state machine with take-profit/stop-loss exits
//!   and a mandatory cooldown after every close
//! - Append-only performance accumulator

pub mod domain;
pub mod feed;
pub mod performance;
pub mod position_management;
pub mod predictor;
