/// Common error type for the relay core.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RelayError {
    #[error("malformed telemetry: {0}")]
    MalformedTelemetry(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error("broker disconnected: {0}")]
    BrokerDisconnect(String),
}

pub type RelayResult<T> = Result<T, RelayError>;
