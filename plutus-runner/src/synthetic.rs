//! Seeded synthetic candle generation.
//!
//! A geometric random walk with intrabar wicks — enough structure for demos,
//! benchmarks and deterministic tests. Same seed, same series.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use plutus_core::domain::Candlestick;

/// Generate `n` candles at `interval_minutes`, starting at `start` from
/// `start_price`.
pub fn synthetic_candles(
    n: usize,
    start: DateTime<Utc>,
    interval_minutes: u32,
    seed: u64,
    start_price: f64,
) -> Vec<Candlestick> {
    let mut rng = StdRng::seed_from_u64(seed);
    let interval = Duration::minutes(i64::from(interval_minutes.max(1)));
    let mut open = start_price.max(0.01);
    let mut candles = Vec::with_capacity(n);

    for i in 0..n {
        let open_time = start + interval * (i as i32);
        let drift_pct: f64 = rng.gen_range(-0.6..0.6);
        let close = (open * (1.0 + drift_pct / 100.0)).max(0.01);
        let up_wick_pct: f64 = rng.gen_range(0.0..0.4);
        let down_wick_pct: f64 = rng.gen_range(0.0..0.4);
        let high = open.max(close) * (1.0 + up_wick_pct / 100.0);
        let low = (open.min(close) * (1.0 - down_wick_pct / 100.0)).max(0.005);
        let volume = rng.gen_range(100.0..10_000.0_f64);

        candles.push(Candlestick {
            open_time,
            close_time: open_time + interval,
            open,
            high,
            low,
            close,
            volume,
        });
        open = close;
    }

    candles
}
