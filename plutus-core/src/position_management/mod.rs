//! Position management: one position slot per model.
//!
//! - `manager`: the `Idle | CoolingDown | Open` state machine driven
//!   candle-by-candle, with stop-loss-first exit evaluation and a mandatory
//!   cooldown after every close.

pub mod manager;

pub use manager::{PositionManager, PositionState};
