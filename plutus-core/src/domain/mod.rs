//! Domain types for the Plutus backtest engine.

pub mod candle;
pub mod position;
pub mod prediction;

pub use candle::Candlestick;
pub use position::{ClosedPosition, OpenPosition, PositionSide};
pub use prediction::{Direction, Prediction};
