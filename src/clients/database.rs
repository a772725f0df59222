use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::models::{envelope::Envelope, notification::StoredNotification};

/// Persistence collaborator invoked by the consumer loop for every validated
/// envelope. A failure here finalizes the delivery as a reject.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn create_notification(&self, envelope: &Envelope) -> Result<StoredNotification, Error>;
}

pub struct NotificationStore {
    client: Client,
}

impl NotificationStore {
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        info!("Connecting to PostgreSQL database");

        let (client, connection) = tokio_postgres::connect(database_url, NoTls)
            .await
            .map_err(|e| anyhow!("Failed to connect to database: {}", e))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection task ended");
            }
        });

        info!("PostgreSQL connection established");

        Ok(Self { client })
    }

    /// Flips only the `read` column; every other field is left untouched.
    pub async fn mark_read(&self, id: Uuid) -> Result<StoredNotification, Error> {
        let row = self
            .client
            .query_one(
                r#"
                UPDATE notifications
                SET read = TRUE
                WHERE id = $1
                RETURNING id, user_id, notification_type, title, body, link, sent_at, read
                "#,
                &[&id],
            )
            .await
            .map_err(|e| anyhow!("Failed to mark notification {} as read: {}", id, e))?;

        from_row(&row)
    }

    pub async fn health_check(&self) -> Result<(), Error> {
        self.client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| anyhow!("Database health check failed: {}", e))?;

        Ok(())
    }
}

#[async_trait]
impl NotificationSink for NotificationStore {
    async fn create_notification(&self, envelope: &Envelope) -> Result<StoredNotification, Error> {
        let id = Uuid::new_v4();
        let notification_type = envelope.notification_type.as_str();
        let sent_at = envelope.sent_at.unwrap_or_else(Utc::now);

        let row = self
            .client
            .query_one(
                r#"
                INSERT INTO notifications
                    (id, user_id, notification_type, title, body, link, sent_at, read)
                VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE)
                RETURNING id, user_id, notification_type, title, body, link, sent_at, read
                "#,
                &[
                    &id,
                    &envelope.user_id,
                    &notification_type,
                    &envelope.content.title,
                    &envelope.content.body,
                    &envelope.content.link,
                    &sent_at,
                ],
            )
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    user_id = %envelope.user_id,
                    "Failed to write notification to database"
                );
                anyhow!("Database write failed: {}", e)
            })?;

        let stored = from_row(&row)?;

        debug!(
            notification_id = %stored.id,
            user_id = %stored.user_id,
            "Notification written to database"
        );

        Ok(stored)
    }
}

fn from_row(row: &Row) -> Result<StoredNotification, Error> {
    let type_str: String = row.get("notification_type");

    Ok(StoredNotification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        notification_type: type_str.parse()?,
        title: row.get("title"),
        body: row.get("body"),
        link: row.get("link"),
        sent_at: row.get("sent_at"),
        read: row.get("read"),
    })
}
