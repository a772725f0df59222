use std::sync::Arc;

use anyhow::{Error, Result};
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    clients::publisher::MessageProducer,
    models::{
        domain::OrderBook,
        envelope::{Envelope, EnvelopeContent, NotificationType},
    },
};

/// Walks the order book and publishes an `order_update` event for every
/// status transition observed on this run. Transitions are not deduplicated;
/// a publish failure is simply retried by whatever transition the next tick
/// observes.
pub async fn check_order_statuses(
    orders: Arc<Mutex<OrderBook>>,
    producer: Arc<dyn MessageProducer>,
) -> Result<(), Error> {
    info!("Running order status check job");

    let advanced = {
        let mut book = orders.lock().await;
        let now = Utc::now();

        book.order_ids()
            .iter()
            .filter_map(|order_id| book.advance(order_id, now))
            .collect::<Vec<_>>()
    };

    let mut published = 0;

    for order in &advanced {
        let envelope = Envelope::new(
            order.user_id.clone(),
            NotificationType::OrderUpdate,
            EnvelopeContent::new(
                format!("Order {} Update", order.order_id),
                format!(
                    "The status of your order {} is now: {}.",
                    order.order_id, order.status
                ),
            )
            .with_link(format!("/orders/{}", order.order_id)),
        );

        if producer.publish(&envelope).await {
            published += 1;
        } else {
            warn!(
                order_id = %order.order_id,
                user_id = %order.user_id,
                "Order update publish failed, waiting for the next tick"
            );
        }
    }

    info!(
        updated = advanced.len(),
        published, "Order status check job finished"
    );

    Ok(())
}
