use crate::prelude::{RelayError, RelayResult};
use serde::{Deserialize, Serialize};

/// Fixed reference point, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
}

impl Anchor {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The two colinear anchors the estimator solves against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPair {
    pub anchor1: Anchor,
    pub anchor2: Anchor,
}

impl AnchorPair {
    /// Builds a pair, rejecting layouts the bilateration cannot solve.
    pub fn new(anchor1: Anchor, anchor2: Anchor) -> RelayResult<Self> {
        let pair = Self { anchor1, anchor2 };
        pair.validate()?;
        Ok(pair)
    }

    /// Distance along x between the anchors.
    pub fn baseline(&self) -> f64 {
        self.anchor2.x - self.anchor1.x
    }

    pub fn validate(&self) -> RelayResult<()> {
        let coords = [
            self.anchor1.x,
            self.anchor1.y,
            self.anchor2.x,
            self.anchor2.y,
        ];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(RelayError::InvalidConfig(
                "anchor coordinates must be finite".into(),
            ));
        }
        if self.baseline() <= 0.0 {
            return Err(RelayError::InvalidConfig(format!(
                "anchor2.x ({}) must be greater than anchor1.x ({})",
                self.anchor2.x, self.anchor1.x
            )));
        }
        if self.anchor1.y != self.anchor2.y {
            return Err(RelayError::InvalidConfig(format!(
                "anchors must share a y coordinate (got {} and {})",
                self.anchor1.y, self.anchor2.y
            )));
        }
        Ok(())
    }
}

impl Default for AnchorPair {
    fn default() -> Self {
        Self {
            anchor1: Anchor::new(0.0, 0.0),
            anchor2: Anchor::new(5.0, 0.0),
        }
    }
}

/// Position pushed to display clients as `update_position`.
///
/// `x`/`y` carry three decimals. `obstacle_distance` is echoed from the
/// inbound telemetry untouched, and `anchors` snapshots the configuration so
/// clients can draw the baseline without their own copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionEstimate {
    pub x: f64,
    pub y: f64,
    pub obstacle_distance: serde_json::Value,
    pub anchors: AnchorPair,
}
