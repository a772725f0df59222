use thiserror::Error;

/// Connection-level failures. These never cross the connection manager
/// boundary as panics; the next `ensure_ready` call retries.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker connection failed: {0}")]
    Connection(String),

    /// Declare failed. Treated exactly like a connection failure: handles are
    /// dropped and the state returns to `Disconnected`.
    #[error("topology declaration failed: {0}")]
    Topology(#[source] lapin::Error),
}

/// Terminal per-delivery failures in the consumer. Both variants finalize the
/// message with a reject (no requeue); neither crashes the consumer loop.
#[derive(Debug, Error)]
pub enum ConsumeError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("persistence failed: {0}")]
    Persistence(anyhow::Error),
}
