//! Per-model position state machine.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{Candlestick, ClosedPosition, OpenPosition, PositionSide};
use crate::predictor::{PredictionError, PredictionProvider};

/// Lifecycle state of the single position slot.
#[derive(Debug, Clone)]
pub enum PositionState {
    /// No position, free to open on the next non-neutral prediction.
    Idle,
    /// No position, and no new one until `until`.
    CoolingDown { until: DateTime<Utc> },
    /// One open position being checked against every new candle.
    Open(OpenPosition),
}

/// Exit decision for an open position under the current candle.
struct Exit {
    outcome: bool,
    price: f64,
}

/// Drives exactly one position slot for one model.
///
/// State transitions are applied strictly in candle order:
/// - `Open` → `CoolingDown` when the candle's extremes cross an exit price.
///   The stop-loss is evaluated first, so a candle that touches both
///   thresholds always closes as a loss.
/// - `CoolingDown` → `Idle` once `candle.open_time >= until`; the prediction
///   for that same candle is then made immediately.
/// - `Idle` → `Open` on a non-neutral prediction, entered at the candle's
///   open price. No position is opened on the final candle of a replay — it
///   could never be closed and would be discarded anyway.
pub struct PositionManager {
    take_profit: f64,
    stop_loss: f64,
    idle_on_close: Duration,
    state: PositionState,
}

impl PositionManager {
    /// `take_profit`/`stop_loss` are percentages (1.0 = 1%); validation of
    /// positivity happens at the config boundary.
    pub fn new(take_profit: f64, stop_loss: f64, idle_minutes_on_position_close: u32) -> Self {
        Self {
            take_profit,
            stop_loss,
            idle_on_close: Duration::minutes(i64::from(idle_minutes_on_position_close)),
            state: PositionState::Idle,
        }
    }

    pub fn state(&self) -> &PositionState {
        &self.state
    }

    pub fn has_open_position(&self) -> bool {
        matches!(self.state, PositionState::Open(_))
    }

    /// Advance the state machine by one candle.
    ///
    /// Returns the closed position if this candle triggered an exit. A
    /// provider error aborts the replay: the state is sequential and cannot
    /// be resumed after a skipped prediction.
    pub fn advance(
        &mut self,
        candle: &Candlestick,
        lookback: &[Candlestick],
        provider: &mut dyn PredictionProvider,
        is_last: bool,
    ) -> Result<Option<ClosedPosition>, PredictionError> {
        let state = std::mem::replace(&mut self.state, PositionState::Idle);
        match state {
            PositionState::Open(position) => match Self::evaluate_exit(&position, candle) {
                Some(exit) => {
                    self.state = PositionState::CoolingDown {
                        until: candle.close_time + self.idle_on_close,
                    };
                    let points = if exit.outcome {
                        self.take_profit
                    } else {
                        -self.stop_loss
                    };
                    Ok(Some(position.close(
                        exit.outcome,
                        exit.price,
                        candle.close_time,
                        points,
                    )))
                }
                None => {
                    self.state = PositionState::Open(position);
                    Ok(None)
                }
            },
            PositionState::CoolingDown { until } if candle.open_time < until => {
                self.state = PositionState::CoolingDown { until };
                Ok(None)
            }
            // Idle, or a cooldown that has just elapsed.
            _ => {
                if !is_last {
                    let prediction = provider.predict(candle.open_time, lookback)?;
                    if let Some(side) = prediction.result.side() {
                        self.state = PositionState::Open(OpenPosition::open(
                            side,
                            prediction,
                            candle,
                            self.take_profit,
                            self.stop_loss,
                        ));
                    }
                }
                Ok(None)
            }
        }
    }

    /// Whether the candle's extremes close the position. Stop-loss first.
    fn evaluate_exit(position: &OpenPosition, candle: &Candlestick) -> Option<Exit> {
        match position.side {
            PositionSide::Long => {
                if candle.low <= position.stop_loss_price {
                    Some(Exit {
                        outcome: false,
                        price: position.stop_loss_price,
                    })
                } else if candle.high >= position.take_profit_price {
                    Some(Exit {
                        outcome: true,
                        price: position.take_profit_price,
                    })
                } else {
                    None
                }
            }
            PositionSide::Short => {
                if candle.high >= position.stop_loss_price {
                    Some(Exit {
                        outcome: false,
                        price: position.stop_loss_price,
                    })
                } else if candle.low <= position.take_profit_price {
                    Some(Exit {
                        outcome: true,
                        price: position.take_profit_price,
                    })
                } else {
                    None
                }
            }
        }
    }
}
