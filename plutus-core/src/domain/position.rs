//! Open and closed positions.
//!
//! A position is two types, not one: `OpenPosition` has no close fields at
//! all, and `close()` consumes it to produce an immutable `ClosedPosition`.
//! The close fields are therefore set together, exactly once, and a closed
//! position can never be reopened or mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::candle::Candlestick;
use super::prediction::Prediction;

/// Side of a simulated trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

/// A simulated trade that has been entered but not yet exited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub side: PositionSide,
    /// The prediction that triggered the entry. Reporting only.
    pub prediction: Prediction,
    pub open_time: DateTime<Utc>,
    pub open_price: f64,
    pub take_profit_price: f64,
    pub stop_loss_price: f64,
}

impl OpenPosition {
    /// Open a position at the candle's open price.
    ///
    /// Exit prices are the open price altered by the configured percentages:
    /// a long takes profit above and stops out below, a short is inverted.
    pub fn open(
        side: PositionSide,
        prediction: Prediction,
        candle: &Candlestick,
        take_profit_pct: f64,
        stop_loss_pct: f64,
    ) -> Self {
        let open_price = candle.open;
        let (take_profit_price, stop_loss_price) = match side {
            PositionSide::Long => (
                alter_by_pct(open_price, take_profit_pct),
                alter_by_pct(open_price, -stop_loss_pct),
            ),
            PositionSide::Short => (
                alter_by_pct(open_price, -take_profit_pct),
                alter_by_pct(open_price, stop_loss_pct),
            ),
        };
        Self {
            side,
            prediction,
            open_time: candle.open_time,
            open_price,
            take_profit_price,
            stop_loss_price,
        }
    }

    /// Finalize the position. Consumes self: a position closes exactly once.
    pub fn close(
        self,
        outcome: bool,
        close_price: f64,
        close_time: DateTime<Utc>,
        points: f64,
    ) -> ClosedPosition {
        ClosedPosition {
            side: self.side,
            prediction: self.prediction,
            open_time: self.open_time,
            open_price: self.open_price,
            take_profit_price: self.take_profit_price,
            stop_loss_price: self.stop_loss_price,
            close_time,
            close_price,
            outcome,
            points,
        }
    }
}

/// A completed simulated trade, appended to the performance record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub side: PositionSide,
    pub prediction: Prediction,
    pub open_time: DateTime<Utc>,
    pub open_price: f64,
    pub take_profit_price: f64,
    pub stop_loss_price: f64,
    pub close_time: DateTime<Utc>,
    /// The take-profit or stop-loss price, whichever triggered the exit.
    pub close_price: f64,
    /// True if the take-profit was hit.
    pub outcome: bool,
    /// Signed points contributed by this trade.
    pub points: f64,
}

impl ClosedPosition {
    pub fn is_winner(&self) -> bool {
        self.outcome
    }
}

/// `value` altered by `pct` percent (pct = 1.0 means +1%).
fn alter_by_pct(value: f64, pct: f64) -> f64 {
    value * (1.0 + pct / 100.0)
}
