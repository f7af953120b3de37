//! Performance accumulation — append-only bookkeeping over closed positions.
//!
//! No I/O and no side effects: the accumulator ingests closed positions in
//! replay order and `finalize()` derives the aggregate record once.

use serde::{Deserialize, Serialize};

use crate::domain::{ClosedPosition, PositionSide};

/// Final performance record for one model over one full replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    /// Final running total of signed points.
    pub points: f64,
    /// Running-total snapshots, one per closed position.
    pub points_hist: Vec<f64>,
    /// Median of `points_hist` (0 when no positions closed).
    pub points_median: f64,
    /// Every closed position, in close order.
    pub positions: Vec<ClosedPosition>,
    pub long_num: usize,
    pub short_num: usize,
    pub long_wins: usize,
    pub short_wins: usize,
    /// Fraction of winning longs in [0, 1]; 0 when no longs closed.
    pub long_acc: f64,
    /// Fraction of winning shorts in [0, 1]; 0 when no shorts closed.
    pub short_acc: f64,
    /// Fraction of winning positions overall; 0 when none closed.
    pub general_acc: f64,
}

/// Running accumulator for one model's replay.
#[derive(Debug, Default)]
pub struct PerformanceAccumulator {
    points: f64,
    points_hist: Vec<f64>,
    positions: Vec<ClosedPosition>,
    long_num: usize,
    short_num: usize,
    long_wins: usize,
    short_wins: usize,
}

impl PerformanceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current running total.
    pub fn points(&self) -> f64 {
        self.points
    }

    pub fn closed_count(&self) -> usize {
        self.positions.len()
    }

    /// Record one closed position: update the point ledger and counters,
    /// then append the position itself.
    pub fn record(&mut self, closed: ClosedPosition) {
        // Two-decimal ledger, matching the historical result format.
        self.points = round2(self.points + closed.points);
        self.points_hist.push(self.points);

        match closed.side {
            PositionSide::Long => {
                self.long_num += 1;
                if closed.outcome {
                    self.long_wins += 1;
                }
            }
            PositionSide::Short => {
                self.short_num += 1;
                if closed.outcome {
                    self.short_wins += 1;
                }
            }
        }

        self.positions.push(closed);
    }

    /// Derive the final record. Accuracies and the median are computed here,
    /// once, never incrementally.
    pub fn finalize(self) -> PerformanceRecord {
        let total = self.long_num + self.short_num;
        let wins = self.long_wins + self.short_wins;
        PerformanceRecord {
            points: self.points,
            points_median: median(&self.points_hist),
            long_acc: accuracy(self.long_wins, self.long_num),
            short_acc: accuracy(self.short_wins, self.short_num),
            general_acc: accuracy(wins, total),
            points_hist: self.points_hist,
            positions: self.positions,
            long_num: self.long_num,
            short_num: self.short_num,
            long_wins: self.long_wins,
            short_wins: self.short_wins,
        }
    }
}

fn accuracy(wins: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    wins as f64 / total as f64
}

/// Median of an unsorted list; 0 when empty, mean of the middle pair when even.
fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
