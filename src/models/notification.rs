use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::envelope::NotificationType;

/// A notification as persisted by the store and returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct StoredNotification {
    pub id: Uuid,
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
}
