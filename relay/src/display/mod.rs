pub mod bridge;
pub mod client;
pub mod model;

pub use bridge::routes;
pub use client::WsClient;
