//! CSV candle loading.
//!
//! Candle files use the historical column layout: `ot,ct,o,h,l,c,v` with
//! millisecond epoch timestamps. Loading validates ordering, uniqueness and
//! OHLC sanity via `CandleSeries`, so a loaded file is immediately usable by
//! the engine.

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use plutus_core::domain::Candlestick;
use plutus_core::feed::{CandleSeries, FeedError};

/// Errors raised while loading candle files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read candle file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse candle file: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid millisecond timestamp {value} in record {record}")]
    InvalidTimestamp { record: usize, value: i64 },

    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// On-disk candle row. Short column names match the historical files.
#[derive(Debug, Serialize, Deserialize)]
struct CandleRow {
    ot: i64,
    ct: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

fn millis_to_datetime(ms: i64, record: usize) -> Result<DateTime<Utc>, LoadError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or(LoadError::InvalidTimestamp { record, value: ms })
}

/// Load a candle CSV file into a validated series.
pub fn load_candles_csv(path: &Path) -> Result<CandleSeries, LoadError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut candles = Vec::new();
    for (record, row) in reader.deserialize::<CandleRow>().enumerate() {
        let row = row?;
        candles.push(Candlestick {
            open_time: millis_to_datetime(row.ot, record)?,
            close_time: millis_to_datetime(row.ct, record)?,
            open: row.o,
            high: row.h,
            low: row.l,
            close: row.c,
            volume: row.v,
        });
    }
    Ok(CandleSeries::new(candles)?)
}

/// Write candles in the same layout `load_candles_csv` reads.
pub fn write_candles_csv(path: &Path, candles: &[Candlestick]) -> Result<(), LoadError> {
    let mut writer = csv::Writer::from_path(path)?;
    for candle in candles {
        writer.serialize(CandleRow {
            ot: candle.open_time.timestamp_millis(),
            ct: candle.close_time.timestamp_millis(),
            o: candle.open,
            h: candle.high,
            l: candle.low,
            c: candle.close,
            v: candle.volume,
        })?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}
