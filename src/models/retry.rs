/// Bounded retry with exponential backoff, used for startup dependencies.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: u64,
}

/// Restart policy for the supervised consumer loop: unbounded in attempts
/// (it restarts until shutdown) but bounded in delay.
#[derive(Debug, Clone)]
pub struct RestartPolicy {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: u64,
}
