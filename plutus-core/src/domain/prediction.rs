//! Prediction — a directional signal emitted by a model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::PositionSide;

/// Directional prediction result.
///
/// Serialized as -1/0/1 so result files stay compatible with the historical
/// wire format used by downstream analysis tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Direction {
    Short,
    Neutral,
    Long,
}

impl Direction {
    pub fn is_neutral(&self) -> bool {
        matches!(self, Direction::Neutral)
    }

    /// The position side a non-neutral prediction opens, if any.
    pub fn side(&self) -> Option<PositionSide> {
        match self {
            Direction::Long => Some(PositionSide::Long),
            Direction::Short => Some(PositionSide::Short),
            Direction::Neutral => None,
        }
    }
}

impl From<Direction> for i8 {
    fn from(d: Direction) -> i8 {
        match d {
            Direction::Short => -1,
            Direction::Neutral => 0,
            Direction::Long => 1,
        }
    }
}

impl TryFrom<i8> for Direction {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Direction::Short),
            0 => Ok(Direction::Neutral),
            1 => Ok(Direction::Long),
            other => Err(format!("invalid direction: {other} (expected -1, 0 or 1)")),
        }
    }
}

/// A model prediction at a point in time.
///
/// `metadata` is carried through to the result file for reporting but never
/// drives control flow inside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "r")]
    pub result: Direction,
    #[serde(rename = "t")]
    pub at: DateTime<Utc>,
    #[serde(rename = "md", default)]
    pub metadata: serde_json::Value,
}

impl Prediction {
    pub fn new(result: Direction, at: DateTime<Utc>) -> Self {
        Self {
            result,
            at,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn direction_wire_format() {
        assert_eq!(serde_json::to_string(&Direction::Short).unwrap(), "-1");
        assert_eq!(serde_json::to_string(&Direction::Neutral).unwrap(), "0");
        assert_eq!(serde_json::to_string(&Direction::Long).unwrap(), "1");

        let d: Direction = serde_json::from_str("-1").unwrap();
        assert_eq!(d, Direction::Short);
        assert!(serde_json::from_str::<Direction>("2").is_err());
    }

    #[test]
    fn direction_to_side() {
        assert_eq!(Direction::Long.side(), Some(PositionSide::Long));
        assert_eq!(Direction::Short.side(), Some(PositionSide::Short));
        assert_eq!(Direction::Neutral.side(), None);
        assert!(Direction::Neutral.is_neutral());
    }

    #[test]
    fn prediction_roundtrip_with_metadata() {
        let at = Utc.with_ymd_and_hms(2022, 3, 1, 10, 0, 0).unwrap();
        let pred = Prediction::new(Direction::Long, at)
            .with_metadata(serde_json::json!({ "probability": 0.73 }));
        let json = serde_json::to_string(&pred).unwrap();
        let deser: Prediction = serde_json::from_str(&json).unwrap();
        assert_eq!(pred, deser);
    }
}
