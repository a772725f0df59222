use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::broker::ConnectionState;

/// Consumer loop lifecycle, observable through the status surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumerState {
    Stopped,
    Starting,
    Consuming,
    Stopping,
}

impl ConsumerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumerState::Stopped => "stopped",
            ConsumerState::Starting => "starting",
            ConsumerState::Consuming => "consuming",
            ConsumerState::Stopping => "stopping",
        }
    }
}

impl std::fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only snapshot for operators. Reports current state only; no probing,
/// no mutation.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub producer_connection: ConnectionState,
    pub consumer_connection: ConnectionState,
    pub consumer_loop: ConsumerState,
    pub scheduler_running: bool,
    pub timestamp: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn is_ready(&self) -> bool {
        self.producer_connection == ConnectionState::Ready
            && self.consumer_connection == ConnectionState::Ready
            && self.scheduler_running
    }
}
