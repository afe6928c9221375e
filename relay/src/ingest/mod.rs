pub mod subscriber;

pub use subscriber::BrokerSubscriber;
