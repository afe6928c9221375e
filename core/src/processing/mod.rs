pub mod estimator;
pub mod smoother;

pub use estimator::{
    solve, EstimateOutcome, EstimatorConfig, PositionEstimator, Solution, SolveBranch,
    DEFAULT_MAX_DISTANCE,
};
pub use smoother::{DistanceSmoother, SampleWindow, SmoothedPair, DEFAULT_SMOOTHING_WINDOW};
