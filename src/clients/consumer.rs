use std::sync::Arc;

use anyhow::{Error, Result};
use futures_util::StreamExt;
use lapin::{
    Channel,
    message::Delivery,
    options::{BasicAckOptions, BasicConsumeOptions, BasicRejectOptions},
    types::FieldTable,
};
use tokio::{
    sync::watch,
    time::{Duration, sleep},
};
use tracing::{error, info, warn};

use crate::{
    clients::{broker::ConnectionManager, database::NotificationSink},
    models::{
        envelope::Envelope,
        error::ConsumeError,
        health::ConsumerState,
        notification::StoredNotification,
        retry::RestartPolicy,
    },
};

const CONSUMER_TAG: &str = "notification_worker";

enum SessionEnd {
    Shutdown,
    StreamClosed,
}

/// Long-running, supervised consumer. Each session subscribes to the queue
/// and finalizes every delivery exactly once: ack on persisted, reject
/// without requeue on malformed payloads and on sink failures.
pub struct ConsumerLoop {
    manager: Arc<ConnectionManager>,
    sink: Arc<dyn NotificationSink>,
    queue: String,
    restart: RestartPolicy,
    state_tx: watch::Sender<ConsumerState>,
}

impl ConsumerLoop {
    pub fn new(
        manager: Arc<ConnectionManager>,
        sink: Arc<dyn NotificationSink>,
        queue: impl Into<String>,
        restart: RestartPolicy,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConsumerState::Stopped);

        Self {
            manager,
            sink,
            queue: queue.into(),
            restart,
            state_tx,
        }
    }

    pub fn state(&self) -> watch::Receiver<ConsumerState> {
        self.state_tx.subscribe()
    }

    /// Runs until shutdown fires. Session failures restart the loop after a
    /// jittered exponential backoff, bounded by the restart policy's delay
    /// cap; the delay resets once a session reaches the consuming state.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut delay_ms = self.restart.initial_delay_ms;

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.transition(ConsumerState::Starting);

            match self.consume_session(&mut shutdown).await {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::StreamClosed) => {
                    warn!(queue = %self.queue, "Delivery stream closed, resubscribing");
                    delay_ms = self.restart.initial_delay_ms;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        delay_ms,
                        "Consumer session failed, restarting after backoff"
                    );

                    let jitter = rand::random_range(-0.1..=0.1);
                    let wait = Duration::from_millis((delay_ms as f64 * (1.0 + jitter)) as u64);

                    tokio::select! {
                        _ = sleep(wait) => {}
                        _ = shutdown.changed() => break,
                    }

                    delay_ms = std::cmp::min(
                        delay_ms * self.restart.backoff_multiplier,
                        self.restart.max_delay_ms,
                    );
                }
            }
        }

        self.transition(ConsumerState::Stopped);
    }

    async fn consume_session(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd, Error> {
        let channel = self.manager.ensure_ready().await?;

        let mut consumer = channel
            .basic_consume(
                &self.queue,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        self.transition(ConsumerState::Consuming);
        info!(queue = %self.queue, "Consumer started");

        loop {
            tokio::select! {
                // The in-flight handler below is awaited inline, so a
                // shutdown can only be observed between deliveries; the
                // ack/nack decision for a message already pulled off the
                // wire is never lost.
                _ = shutdown.changed() => {
                    self.transition(ConsumerState::Stopping);
                    return Ok(SessionEnd::Shutdown);
                }
                delivery = consumer.next() => {
                    match delivery {
                        None => return Ok(SessionEnd::StreamClosed),
                        Some(Err(e)) => return Err(e.into()),
                        Some(Ok(delivery)) => self.handle_delivery(&channel, delivery).await,
                    }
                }
            }
        }
    }

    async fn handle_delivery(&self, channel: &Channel, delivery: Delivery) {
        match process_payload(&delivery.data, self.sink.as_ref()).await {
            Ok(stored) => {
                info!(
                    notification_id = %stored.id,
                    user_id = %stored.user_id,
                    notification_type = %stored.notification_type,
                    "Notification stored"
                );

                if let Err(e) = channel
                    .basic_ack(delivery.delivery_tag, BasicAckOptions::default())
                    .await
                {
                    warn!(error = %e, "Failed to acknowledge delivery");
                }
            }
            Err(ConsumeError::Malformed(reason)) => {
                error!(%reason, "Dropping malformed message");
                self.reject(channel, delivery.delivery_tag).await;
            }
            Err(ConsumeError::Persistence(e)) => {
                // Deliberately no requeue: a failing store must not wedge the
                // queue in a redelivery loop. The loss is loud in the logs.
                error!(error = %e, "Dropping message after persistence failure");
                self.reject(channel, delivery.delivery_tag).await;
            }
        }
    }

    async fn reject(&self, channel: &Channel, delivery_tag: u64) {
        if let Err(e) = channel
            .basic_reject(delivery_tag, BasicRejectOptions { requeue: false })
            .await
        {
            warn!(error = %e, "Failed to reject delivery");
        }
    }

    fn transition(&self, to: ConsumerState) {
        let from = *self.state_tx.borrow();
        if from != to {
            info!(from = %from, to = %to, "Consumer state changed");
        }
        self.state_tx.send_replace(to);
    }
}

/// Per-message pipeline: parse, validate, persist. Malformed payloads never
/// reach the sink.
pub async fn process_payload(
    payload: &[u8],
    sink: &dyn NotificationSink,
) -> Result<StoredNotification, ConsumeError> {
    let envelope: Envelope = serde_json::from_slice(payload)
        .map_err(|e| ConsumeError::Malformed(e.to_string()))?;

    envelope
        .validate()
        .map_err(|e| ConsumeError::Malformed(e.to_string()))?;

    sink.create_notification(&envelope)
        .await
        .map_err(ConsumeError::Persistence)
}
