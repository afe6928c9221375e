use crate::diagnostics::log::LogManager;
use crate::math::stats::StatsHelper;
use crate::prelude::RelayResult;
use crate::processing::smoother::{DistanceSmoother, SmoothedPair, DEFAULT_SMOOTHING_WINDOW};
use crate::wire::{AnchorPair, PositionEstimate, TelemetryReading};

/// Diagonal of a 10 x 10 m room; longer readings are treated as unreliable.
pub const DEFAULT_MAX_DISTANCE: f64 = 14.14;

/// `y^2` magnitudes below this are treated as lying on the baseline.
const FLAT_TOLERANCE: f64 = 1e-6;

/// Placeholder height reported whenever no real `y` can be solved. It is an
/// approximation carried over from the deployed clients, not a measurement.
pub const FLAT_SENTINEL_Y: f64 = 1.0;

/// Which path of the solver produced a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveBranch {
    Exact,
    Flat,
    Ratio,
    ZeroDistance,
}

/// Rounded coordinates plus the branch that produced them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    pub x: f64,
    pub y: f64,
    pub branch: SolveBranch,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig {
    pub anchors: AnchorPair,
    pub smoothing_window: usize,
    pub max_distance: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            anchors: AnchorPair::default(),
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            max_distance: DEFAULT_MAX_DISTANCE,
        }
    }
}

/// Estimate together with the solver path taken.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateOutcome {
    pub estimate: PositionEstimate,
    pub smoothed: SmoothedPair,
    pub branch: SolveBranch,
}

/// Smooths raw distances and solves them against the configured anchors.
pub struct PositionEstimator {
    config: EstimatorConfig,
    smoother: DistanceSmoother,
    logger: LogManager,
}

impl PositionEstimator {
    pub fn new(config: EstimatorConfig) -> RelayResult<Self> {
        config.anchors.validate()?;
        Ok(Self {
            smoother: DistanceSmoother::new(config.smoothing_window),
            config,
            logger: LogManager::new("estimator"),
        })
    }

    pub fn smoother(&self) -> &DistanceSmoother {
        &self.smoother
    }

    /// Feeds one reading through the smoother and solves the averaged pair.
    /// Degenerate geometry never fails; it falls back to a baseline estimate.
    pub fn estimate(&mut self, reading: TelemetryReading) -> EstimateOutcome {
        let smoothed = self.smoother.smooth(reading.distance1, reading.distance2);
        let solution = solve(smoothed, &self.config.anchors, self.config.max_distance);
        self.logger.detail(&format!(
            "d1 {:.3} d2 {:.3} -> ({}, {}) via {:?}",
            smoothed.d1, smoothed.d2, solution.x, solution.y, solution.branch
        ));

        EstimateOutcome {
            estimate: PositionEstimate {
                x: solution.x,
                y: solution.y,
                obstacle_distance: reading.obstacle_distance,
                anchors: self.config.anchors,
            },
            smoothed,
            branch: solution.branch,
        }
    }
}

/// Two-anchor bilateration over already-smoothed distances.
///
/// With both anchors on one row the circles intersect in a mirrored pair of
/// points; the non-negative root is always taken. Readings the geometry
/// cannot explain are placed on the baseline by [`ratio_fallback`] instead of
/// being rejected, trading accuracy for a continuous track.
pub fn solve(pair: SmoothedPair, anchors: &AnchorPair, max_distance: f64) -> Solution {
    let SmoothedPair { d1, d2 } = pair;
    let origin = anchors.anchor1;
    let baseline = anchors.baseline();

    // A zero reading pins the target onto anchor1 whatever the other says.
    if d1 == 0.0 || d2 == 0.0 {
        return Solution {
            x: StatsHelper::round3(origin.x),
            y: StatsHelper::round3(origin.y),
            branch: SolveBranch::ZeroDistance,
        };
    }

    if d1 > max_distance || d2 > max_distance {
        return ratio_fallback(d1, d2, anchors);
    }

    if d1 + d2 <= baseline || d1 + baseline <= d2 || d2 + baseline <= d1 {
        return ratio_fallback(d1, d2, anchors);
    }

    let relative_x = (d1 * d1 - d2 * d2 + baseline * baseline) / (2.0 * baseline);
    let absolute_x = (origin.x + relative_x).clamp(origin.x, origin.x + baseline);
    let offset = absolute_x - origin.x;
    let y_squared = d1 * d1 - offset * offset;

    if y_squared.abs() < FLAT_TOLERANCE {
        return Solution {
            x: StatsHelper::round3(absolute_x),
            y: FLAT_SENTINEL_Y,
            branch: SolveBranch::Flat,
        };
    }
    if y_squared < 0.0 {
        return ratio_fallback(d1, d2, anchors);
    }

    Solution {
        x: StatsHelper::round3(absolute_x),
        y: StatsHelper::round3(y_squared.sqrt()),
        branch: SolveBranch::Exact,
    }
}

/// Places the target on the baseline in proportion to `d1 / (d1 + d2)`.
fn ratio_fallback(d1: f64, d2: f64, anchors: &AnchorPair) -> Solution {
    let total = d1 + d2;
    let ratio = if total > 0.0 {
        (d1 / total).clamp(0.0, 1.0)
    } else {
        0.0
    };
    Solution {
        x: StatsHelper::round3(anchors.anchor1.x + ratio * anchors.baseline()),
        y: FLAT_SENTINEL_Y,
        branch: SolveBranch::Ratio,
    }
}
