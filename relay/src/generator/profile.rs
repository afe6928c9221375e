use anchorcore::wire::{AnchorPair, RawDistance, TelemetryPayload};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Configuration for a synthetic target walking along the anchor baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub samples: usize,
    /// Perpendicular offset of the walk from the baseline, in metres.
    pub offset: f64,
    /// Uniform noise amplitude added to each distance, in metres.
    pub noise: f64,
    pub seed: u64,
    pub obstacle_cm: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            samples: 50,
            offset: 1.5,
            noise: 0.05,
            seed: 0,
            obstacle_cm: 120.0,
        }
    }
}

/// Builds payloads for a target moving from anchor1 to anchor2.
///
/// Odd samples encode distances as strings, matching publishers that send
/// text fields.
pub fn build_walk(config: &GeneratorConfig, anchors: &AnchorPair) -> Vec<TelemetryPayload> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let steps = config.samples.max(1);
    let baseline = anchors.baseline();
    let row = anchors.anchor1.y;

    (0..steps)
        .map(|step| {
            let progress = if steps > 1 {
                step as f64 / (steps - 1) as f64
            } else {
                0.5
            };
            let x = anchors.anchor1.x + progress * baseline;
            let y = row + config.offset;
            let true_d1 = (x - anchors.anchor1.x).hypot(y - anchors.anchor1.y);
            let true_d2 = (x - anchors.anchor2.x).hypot(y - anchors.anchor2.y);

            let mut jitter = || {
                if config.noise > 0.0 {
                    rng.gen_range(-config.noise..config.noise)
                } else {
                    0.0
                }
            };
            let d1 = (true_d1 + jitter()).max(0.0);
            let d2 = (true_d2 + jitter()).max(0.0);
            let obstacle = (config.obstacle_cm + jitter() * 100.0).max(0.0).round();

            let encode = |value: f64| {
                if step % 2 == 1 {
                    RawDistance::Text(format!("{:.3}", value))
                } else {
                    RawDistance::Number(value)
                }
            };
            TelemetryPayload {
                distance1: encode(d1),
                distance2: encode(d2),
                obstacle_distance: json!(obstacle),
            }
        })
        .collect()
}
