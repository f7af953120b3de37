//! Candle feed — validated, immutable snapshot of a candlestick series.
//!
//! The engine's read contract with the external candlestick store: strictly
//! increasing open times, sane bars, range and lookback access. The series is
//! validated once on construction and shared read-only across the sequential
//! per-model replays.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::Candlestick;

/// Structured errors raised while building a candle series.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("candles out of order at index {index}: {current} does not follow {previous}")]
    OutOfOrder {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("duplicate open time at index {index}: {at}")]
    DuplicateTimestamp { index: usize, at: DateTime<Utc> },

    #[error("insane candle at index {index} ({at}): OHLC values are inconsistent")]
    InsaneCandle { index: usize, at: DateTime<Utc> },
}

/// An immutable, time-ordered candlestick series.
///
/// Construction validates ordering, uniqueness and OHLC sanity so every
/// downstream consumer can index and slice without re-checking.
/// Deliberately not deserializable: the only way in is `new`.
#[derive(Debug, Clone)]
pub struct CandleSeries {
    candles: Vec<Candlestick>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candlestick>) -> Result<Self, FeedError> {
        for (index, candle) in candles.iter().enumerate() {
            if !candle.is_sane() {
                return Err(FeedError::InsaneCandle {
                    index,
                    at: candle.open_time,
                });
            }
            if index > 0 {
                let previous = candles[index - 1].open_time;
                if candle.open_time == previous {
                    return Err(FeedError::DuplicateTimestamp {
                        index,
                        at: candle.open_time,
                    });
                }
                if candle.open_time < previous {
                    return Err(FeedError::OutOfOrder {
                        index,
                        previous,
                        current: candle.open_time,
                    });
                }
            }
        }
        Ok(Self { candles })
    }

    /// The full ordered series.
    pub fn candles(&self) -> &[Candlestick] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Open time of the first candle.
    pub fn earliest(&self) -> Option<DateTime<Utc>> {
        self.candles.first().map(|c| c.open_time)
    }

    /// Close time of the last candle.
    pub fn latest(&self) -> Option<DateTime<Utc>> {
        self.candles.last().map(|c| c.close_time)
    }

    /// Candles whose open time falls in `[start, end]`. `None` bounds fall
    /// back to the full series. Restartable: every call returns the same
    /// slice for the same bounds.
    pub fn range(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> &[Candlestick] {
        let lo = match start {
            Some(s) => self.candles.partition_point(|c| c.open_time < s),
            None => 0,
        };
        let hi = match end {
            Some(e) => self.candles.partition_point(|c| c.open_time <= e),
            None => self.candles.len(),
        };
        if lo >= hi {
            return &[];
        }
        &self.candles[lo..hi]
    }

    /// The up-to-`n` candles with open time strictly before `at`, in time
    /// order. Shorter near the start of the series.
    pub fn lookback(&self, n: usize, at: DateTime<Utc>) -> &[Candlestick] {
        let end = self.candles.partition_point(|c| c.open_time < at);
        let start = end.saturating_sub(n);
        &self.candles[start..end]
    }
}
