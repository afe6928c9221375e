use crate::prelude::{RelayError, RelayResult};
use serde::{Deserialize, Serialize};

/// Distance field as publishers send it: either a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDistance {
    Number(f64),
    Text(String),
}

impl RawDistance {
    /// Parses into metres; anything that is not a finite float is malformed.
    pub fn parse(&self, field: &str) -> RelayResult<f64> {
        let value = match self {
            RawDistance::Number(value) => *value,
            RawDistance::Text(text) => text.trim().parse::<f64>().map_err(|err| {
                RelayError::MalformedTelemetry(format!("{field} {text:?}: {err}"))
            })?,
        };
        if !value.is_finite() {
            return Err(RelayError::MalformedTelemetry(format!(
                "{field} is not finite"
            )));
        }
        Ok(value)
    }
}

/// Inbound record on the telemetry topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    pub distance1: RawDistance,
    pub distance2: RawDistance,
    pub obstacle_distance: serde_json::Value,
}

impl TelemetryPayload {
    pub fn from_json(text: &str) -> RelayResult<Self> {
        serde_json::from_str(text).map_err(|err| RelayError::MalformedTelemetry(err.to_string()))
    }

    pub fn from_value(value: serde_json::Value) -> RelayResult<Self> {
        serde_json::from_value(value)
            .map_err(|err| RelayError::MalformedTelemetry(err.to_string()))
    }

    /// Validates the loose payload into a typed reading.
    pub fn into_reading(self) -> RelayResult<TelemetryReading> {
        Ok(TelemetryReading {
            distance1: self.distance1.parse("distance1")?,
            distance2: self.distance2.parse("distance2")?,
            obstacle_distance: self.obstacle_distance,
        })
    }
}

/// Telemetry after boundary validation.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryReading {
    pub distance1: f64,
    pub distance2: f64,
    pub obstacle_distance: serde_json::Value,
}
