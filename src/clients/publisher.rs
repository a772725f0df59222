use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use lapin::{BasicProperties, options::BasicPublishOptions};
use tracing::{debug, error, warn};

use crate::{
    clients::broker::ConnectionManager,
    models::{
        broker::ExchangeType,
        envelope::Envelope,
        error::BrokerError,
    },
};

/// Producer-facing interface consumed by job bodies and any request layer.
/// Never throws for broker-availability reasons; callers count failures and
/// rely on the next tick to try again.
#[async_trait]
pub trait MessageProducer: Send + Sync {
    async fn publish(&self, envelope: &Envelope) -> bool;
}

pub struct EventPublisher {
    manager: Arc<ConnectionManager>,
    exchange: String,
    exchange_type: ExchangeType,
}

impl EventPublisher {
    pub fn new(
        manager: Arc<ConnectionManager>,
        exchange: impl Into<String>,
        exchange_type: ExchangeType,
    ) -> Self {
        Self {
            manager,
            exchange: exchange.into(),
            exchange_type,
        }
    }

    async fn try_publish(&self, routing_key: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let channel = self.manager.ensure_ready().await?;

        channel
            .basic_publish(
                &self.exchange,
                routing_key,
                BasicPublishOptions::default(),
                payload,
                // Delivery mode 2: the broker must retain the message across
                // its own restart.
                BasicProperties::default()
                    .with_content_type("application/json".into())
                    .with_delivery_mode(2),
            )
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        Ok(())
    }

    fn routing_key(&self, envelope: &Envelope) -> String {
        match self.exchange_type {
            ExchangeType::Fanout => String::new(),
            ExchangeType::Direct => format!(
                "notification.{}.{}",
                envelope.notification_type, envelope.user_id
            ),
        }
    }
}

#[async_trait]
impl MessageProducer for EventPublisher {
    async fn publish(&self, envelope: &Envelope) -> bool {
        let mut envelope = envelope.clone();
        if envelope.sent_at.is_none() {
            envelope.sent_at = Some(Utc::now());
        }

        let payload = match serde_json::to_vec(&envelope) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, user_id = %envelope.user_id, "Envelope serialization failed");
                return false;
            }
        };

        let routing_key = self.routing_key(&envelope);

        match self.try_publish(&routing_key, &payload).await {
            Ok(()) => {
                debug!(
                    exchange = %self.exchange,
                    routing_key = %routing_key,
                    user_id = %envelope.user_id,
                    "Message published"
                );
                true
            }
            Err(e) => {
                // One reconnect and one retry; beyond that the caller is
                // responsible for being re-invoked on the next tick.
                warn!(
                    error = %e,
                    user_id = %envelope.user_id,
                    "Publish failed, reconnecting for a single retry"
                );
                self.manager.mark_disconnected();

                match self.try_publish(&routing_key, &payload).await {
                    Ok(()) => true,
                    Err(e) => {
                        error!(
                            error = %e,
                            user_id = %envelope.user_id,
                            notification_type = %envelope.notification_type,
                            "Publish failed after retry, giving up"
                        );
                        false
                    }
                }
            }
        }
    }
}
