use std::time::Duration;

use lapin::ExchangeKind;
use serde::{Deserialize, Serialize};

/// One connection manager exists per process per role; each owns its own
/// connection state independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerRole {
    Producer,
    Consumer,
}

impl BrokerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerRole::Producer => "producer",
            BrokerRole::Consumer => "consumer",
        }
    }
}

impl std::fmt::Display for BrokerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeType {
    #[default]
    Fanout,
    Direct,
}

impl ExchangeType {
    pub fn kind(&self) -> ExchangeKind {
        match self {
            ExchangeType::Fanout => ExchangeKind::Fanout,
            ExchangeType::Direct => ExchangeKind::Direct,
        }
    }
}

/// Connection lifecycle: Disconnected -> Connecting -> Ready, back to
/// Disconnected on any broker-initiated close. Topology is valid only while
/// Ready and is redeclared on every transition into Ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Broker wire contract: names and types are configuration, not negotiated.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub url: String,
    pub connect_timeout: Duration,
    pub exchange: String,
    pub exchange_type: ExchangeType,
    pub queue: String,
    pub binding_key: String,
    pub prefetch_count: u16,
}
