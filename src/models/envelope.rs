use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire-level schema shared by every producer and the consumer. Field names
/// are camelCase on the wire; the body is UTF-8 JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "userId")]
    pub user_id: String,

    #[serde(rename = "type")]
    pub notification_type: NotificationType,

    pub content: EnvelopeContent,

    /// Stamped by the publisher when absent; ISO-8601 on the wire.
    #[serde(rename = "sentAt", default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,

    /// Set only by the consuming store, never trusted from the wire.
    #[serde(default)]
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeContent {
    pub title: String,
    pub body: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    OrderUpdate,
    Promotion,
    Recommendation,
}

impl Envelope {
    pub fn new(
        user_id: impl Into<String>,
        notification_type: NotificationType,
        content: EnvelopeContent,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            notification_type,
            content,
            sent_at: None,
            read: false,
        }
    }

    /// Field-level checks beyond what deserialization already enforces. An
    /// envelope failing here is malformed and must never reach the sink.
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(anyhow!("userId must be non-empty"));
        }

        if self.content.title.trim().is_empty() {
            return Err(anyhow!("content.title must be non-empty"));
        }

        if self.content.body.trim().is_empty() {
            return Err(anyhow!("content.body must be non-empty"));
        }

        Ok(())
    }
}

impl EnvelopeContent {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            link: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::OrderUpdate => "order_update",
            NotificationType::Promotion => "promotion",
            NotificationType::Recommendation => "recommendation",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NotificationType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "order_update" => Ok(NotificationType::OrderUpdate),
            "promotion" => Ok(NotificationType::Promotion),
            "recommendation" => Ok(NotificationType::Recommendation),
            other => Err(anyhow!("Unknown notification type: {}", other)),
        }
    }
}
