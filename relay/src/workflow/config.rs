use anchorcore::prelude::{RelayError, RelayResult};
use anchorcore::processing::{EstimatorConfig, DEFAULT_MAX_DISTANCE, DEFAULT_SMOOTHING_WINDOW};
use anchorcore::wire::{Anchor, AnchorPair};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Role marker the mobile display app sends when it identifies itself.
pub const DEFAULT_DISPLAY_ROLE: &str = "react_native";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub anchor1: Anchor,
    pub anchor2: Anchor,
    #[serde(alias = "SMOOTHING_WINDOW")]
    pub smoothing_window: usize,
    #[serde(alias = "MAX_DISTANCE")]
    pub max_distance: f64,
    pub broker_addr: String,
    pub topic: String,
    pub reconnect_delay_ms: u64,
    pub bind_addr: SocketAddr,
    pub display_role: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        let anchors = AnchorPair::default();
        Self {
            anchor1: anchors.anchor1,
            anchor2: anchors.anchor2,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            max_distance: DEFAULT_MAX_DISTANCE,
            broker_addr: "127.0.0.1:1883".into(),
            topic: "uwb/distance".into(),
            reconnect_delay_ms: 2000,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            display_role: DEFAULT_DISPLAY_ROLE.into(),
        }
    }
}

impl RelayConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading relay config {}", path_ref.display()))?;
        let config: RelayConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing relay config {}", path_ref.display()))?;
        config
            .validate()
            .with_context(|| format!("validating relay config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn anchors(&self) -> AnchorPair {
        AnchorPair {
            anchor1: self.anchor1,
            anchor2: self.anchor2,
        }
    }

    pub fn validate(&self) -> RelayResult<()> {
        self.anchors().validate()?;
        if self.smoothing_window == 0 {
            return Err(RelayError::InvalidConfig(
                "smoothing_window must be at least 1".into(),
            ));
        }
        if self.max_distance.is_nan() || self.max_distance <= 0.0 {
            return Err(RelayError::InvalidConfig(format!(
                "max_distance must be positive (got {})",
                self.max_distance
            )));
        }
        if self.topic.trim().is_empty() {
            return Err(RelayError::InvalidConfig("topic must not be empty".into()));
        }
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn to_estimator_config(&self) -> EstimatorConfig {
        EstimatorConfig {
            anchors: self.anchors(),
            smoothing_window: self.smoothing_window,
            max_distance: self.max_distance,
        }
    }
}
