pub mod registry;

pub use registry::{ClientRegistry, ConnectionId, DisplayConnection, PublishSummary};
