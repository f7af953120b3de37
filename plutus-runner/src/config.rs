//! Serializable backtest configuration.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a configuration.
///
/// All of these surface before any replay starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("backtest id must not be empty")]
    EmptyId,

    #[error("take_profit must be positive, got {0}")]
    NonPositiveTakeProfit(f64),

    #[error("stop_loss must be positive, got {0}")]
    NonPositiveStopLoss(f64),

    #[error("model list must not be empty")]
    NoModels,

    #[error("model at index {0} has an empty id")]
    EmptyModelId(usize),

    #[error("duplicate model id '{0}'")]
    DuplicateModelId(String),

    #[error("start {start} is not before end {end}")]
    StartAfterEnd {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// One model to be replayed. The engine treats `kind` and `params` as
/// opaque — they only matter to whoever constructs the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    pub kind: String,
    /// Number of candles handed to the provider as the lookback window.
    pub lookback: usize,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Configuration for a full backtest run.
///
/// Deserialized from TOML; `start`/`end` are optional RFC 3339 strings and
/// default to the feed bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    /// Take-profit percentage applied to every position (1.0 = 1%).
    pub take_profit: f64,
    /// Stop-loss percentage applied to every position (1.0 = 1%).
    pub stop_loss: f64,
    /// Cooldown after a close, in minutes.
    pub idle_minutes_on_position_close: u32,
    pub models: Vec<ModelConfig>,
}

impl BacktestConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Fail-fast validation, run once before any replay.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::EmptyId);
        }
        if self.take_profit <= 0.0 {
            return Err(ConfigError::NonPositiveTakeProfit(self.take_profit));
        }
        if self.stop_loss <= 0.0 {
            return Err(ConfigError::NonPositiveStopLoss(self.stop_loss));
        }
        if self.models.is_empty() {
            return Err(ConfigError::NoModels);
        }
        for (index, model) in self.models.iter().enumerate() {
            if model.id.trim().is_empty() {
                return Err(ConfigError::EmptyModelId(index));
            }
            if self.models[..index].iter().any(|m| m.id == model.id) {
                return Err(ConfigError::DuplicateModelId(model.id.clone()));
            }
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start >= end {
                return Err(ConfigError::StartAfterEnd { start, end });
            }
        }
        Ok(())
    }

    /// Deterministic content hash of the configuration.
    ///
    /// Two runs with identical configs share the same hash, which makes
    /// result files comparable across replays.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
