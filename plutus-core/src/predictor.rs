//! Prediction provider seam.
//!
//! Models are polymorphic behind `PredictionProvider`; the engine only ever
//! sees a directional signal and never branches on model kind. Caching (if
//! any) is the provider's concern — the replay itself stays deterministic.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Candlestick, Direction, Prediction};

/// Errors from prediction providers.
///
/// These are never retried by the engine: a failed prediction mid-replay
/// invalidates the whole simulation, so the error propagates to the caller.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("insufficient lookback: needed {needed} candles, had {available}")]
    InsufficientLookback { needed: usize, available: usize },

    #[error("provider failure: {0}")]
    Provider(String),
}

/// A prediction-producing model.
///
/// `predict` receives the simulated timestamp and the lookback window the
/// orchestrator resolved for this model. Implementations may keep internal
/// state (`&mut self`), but for a given candle sequence a deterministic
/// provider must yield the same predictions on every replay.
pub trait PredictionProvider: Send {
    /// Human-readable provider name (for error messages and reporting).
    fn name(&self) -> &str;

    fn predict(
        &mut self,
        at: DateTime<Utc>,
        lookback: &[Candlestick],
    ) -> Result<Prediction, PredictionError>;
}

/// Provider registry: builds providers by kind name.
///
/// Lets the runner construct providers from model configurations without the
/// engine knowing concrete types. Constructors receive the model's opaque
/// params value and choose their own defaults for anything missing.
pub struct ProviderRegistry {
    constructors: HashMap<
        String,
        Box<dyn Fn(&serde_json::Value) -> Box<dyn PredictionProvider> + Send + Sync>,
    >,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registry pre-loaded with the reference providers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("neutral", |_| Box::new(NeutralProvider));
        registry.register("momentum", |params| {
            Box::new(MomentumProvider::from_params(params))
        });
        registry.register("consensus", |params| {
            let legs = params
                .get("periods")
                .and_then(|v| v.as_array())
                .map(|arr| arr.iter().filter_map(|v| v.as_u64()).collect::<Vec<_>>())
                .unwrap_or_else(|| vec![3, 5, 8]);
            let providers = legs
                .into_iter()
                .map(|p| {
                    Box::new(MomentumProvider::new(p as usize, 0.0)) as Box<dyn PredictionProvider>
                })
                .collect();
            Box::new(ConsensusProvider::new(providers))
        });
        registry
    }

    pub fn register<F>(&mut self, kind: impl Into<String>, constructor: F)
    where
        F: Fn(&serde_json::Value) -> Box<dyn PredictionProvider> + Send + Sync + 'static,
    {
        self.constructors.insert(kind.into(), Box::new(constructor));
    }

    /// Build a provider by kind name. None if the kind is unknown.
    pub fn create(
        &self,
        kind: &str,
        params: &serde_json::Value,
    ) -> Option<Box<dyn PredictionProvider>> {
        self.constructors.get(kind).map(|ctor| ctor(params))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.constructors.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Provider that always returns a neutral prediction. Baseline/testing.
pub struct NeutralProvider;

impl PredictionProvider for NeutralProvider {
    fn name(&self) -> &str {
        "neutral"
    }

    fn predict(
        &mut self,
        at: DateTime<Utc>,
        _lookback: &[Candlestick],
    ) -> Result<Prediction, PredictionError> {
        Ok(Prediction::new(Direction::Neutral, at))
    }
}

/// Reference momentum provider: direction of the close-to-close move over
/// the last `period` candles, neutral inside `threshold_pct`.
///
/// A deliberately simple deterministic stand-in for the external model
/// server; real deployments inject their own `PredictionProvider`.
pub struct MomentumProvider {
    period: usize,
    threshold_pct: f64,
}

impl MomentumProvider {
    pub fn new(period: usize, threshold_pct: f64) -> Self {
        Self {
            period: period.max(1),
            threshold_pct,
        }
    }

    pub fn from_params(params: &serde_json::Value) -> Self {
        let period = params
            .get("period")
            .and_then(|v| v.as_u64())
            .unwrap_or(5) as usize;
        let threshold_pct = params
            .get("threshold_pct")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        Self::new(period, threshold_pct)
    }
}

impl PredictionProvider for MomentumProvider {
    fn name(&self) -> &str {
        "momentum"
    }

    fn predict(
        &mut self,
        at: DateTime<Utc>,
        lookback: &[Candlestick],
    ) -> Result<Prediction, PredictionError> {
        if lookback.len() < self.period + 1 {
            // Not enough history yet: stay out of the market.
            return Ok(Prediction::new(Direction::Neutral, at));
        }
        let last = lookback[lookback.len() - 1].close;
        let reference = lookback[lookback.len() - 1 - self.period].close;
        if reference <= 0.0 {
            return Err(PredictionError::Provider(format!(
                "non-positive reference close {reference} at {at}"
            )));
        }
        let change_pct = (last - reference) / reference * 100.0;
        let direction = if change_pct > self.threshold_pct {
            Direction::Long
        } else if change_pct < -self.threshold_pct {
            Direction::Short
        } else {
            Direction::Neutral
        };
        Ok(Prediction::new(direction, at)
            .with_metadata(serde_json::json!({ "change_pct": change_pct })))
    }
}

/// Consensus provider: majority vote over sub-providers.
///
/// Long wins when long votes strictly outnumber short votes and vice versa;
/// ties (including all-neutral) yield a neutral prediction. Any failing leg
/// fails the consensus.
pub struct ConsensusProvider {
    providers: Vec<Box<dyn PredictionProvider>>,
}

impl ConsensusProvider {
    pub fn new(providers: Vec<Box<dyn PredictionProvider>>) -> Self {
        Self { providers }
    }
}

impl PredictionProvider for ConsensusProvider {
    fn name(&self) -> &str {
        "consensus"
    }

    fn predict(
        &mut self,
        at: DateTime<Utc>,
        lookback: &[Candlestick],
    ) -> Result<Prediction, PredictionError> {
        let mut longs = 0usize;
        let mut shorts = 0usize;
        for provider in self.providers.iter_mut() {
            match provider.predict(at, lookback)?.result {
                Direction::Long => longs += 1,
                Direction::Short => shorts += 1,
                Direction::Neutral => {}
            }
        }
        let direction = if longs > shorts {
            Direction::Long
        } else if shorts > longs {
            Direction::Short
        } else {
            Direction::Neutral
        };
        Ok(Prediction::new(direction, at)
            .with_metadata(serde_json::json!({ "longs": longs, "shorts": shorts })))
    }
}
