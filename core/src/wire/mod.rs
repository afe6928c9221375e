pub mod position;
pub mod telemetry;

pub use position::{Anchor, AnchorPair, PositionEstimate};
pub use telemetry::{RawDistance, TelemetryPayload, TelemetryReading};
