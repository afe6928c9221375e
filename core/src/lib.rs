//! Core estimation pipeline for the anchor relay.
//!
//! Raw anchor distances are smoothed per anchor, solved into a 2D position
//! against two colinear anchors, and fanned out to registered display
//! connections.

pub mod broadcast;
pub mod diagnostics;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod wire;

pub use prelude::{RelayError, RelayResult};
