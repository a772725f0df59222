use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use notification_pipeline::{
    clients::publisher::MessageProducer,
    jobs,
    models::{
        domain::{Order, OrderBook, OrderStatus, PROMOTIONS, seeded_users},
        envelope::{Envelope, NotificationType},
    },
};
use tokio::sync::Mutex;

/// Producer double capturing every envelope handed to it.
struct CapturingProducer {
    sent: Mutex<Vec<Envelope>>,
    accept: AtomicBool,
}

impl CapturingProducer {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            accept: AtomicBool::new(true),
        }
    }

    fn rejecting() -> Self {
        let producer = Self::new();
        producer.accept.store(false, Ordering::SeqCst);
        producer
    }

    async fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl MessageProducer for CapturingProducer {
    async fn publish(&self, envelope: &Envelope) -> bool {
        if !self.accept.load(Ordering::SeqCst) {
            return false;
        }
        self.sent.lock().await.push(envelope.clone());
        true
    }
}

fn stale_order(order_id: &str, user_id: &str, status: OrderStatus) -> Order {
    Order {
        order_id: order_id.to_string(),
        user_id: user_id.to_string(),
        status,
        last_update: Utc::now() - Duration::seconds(60),
    }
}

/// Test: An observed status transition publishes one order_update envelope
/// with the expected content
#[tokio::test]
async fn test_order_transition_publishes_update() -> Result<()> {
    let orders = Arc::new(Mutex::new(OrderBook::with_orders(
        vec![stale_order(
            "order1001",
            "user1@example.com",
            OrderStatus::Processing,
        )],
        1.0,
    )));
    let producer = Arc::new(CapturingProducer::new());

    jobs::order_updates::check_order_statuses(orders.clone(), producer.clone()).await?;

    let sent = producer.sent().await;
    assert_eq!(sent.len(), 1);

    let envelope = &sent[0];
    assert_eq!(envelope.user_id, "user1@example.com");
    assert_eq!(envelope.notification_type, NotificationType::OrderUpdate);
    assert_eq!(envelope.content.title, "Order order1001 Update");
    assert!(envelope.content.body.contains("shipped"));
    assert_eq!(envelope.content.link.as_deref(), Some("/orders/order1001"));

    let book = orders.lock().await;
    assert_eq!(book.get("order1001").unwrap().status, OrderStatus::Shipped);

    Ok(())
}

/// Test: A freshly updated order is held back on the next run
#[tokio::test]
async fn test_order_update_respects_hold_window() -> Result<()> {
    let orders = Arc::new(Mutex::new(OrderBook::with_orders(
        vec![stale_order(
            "order1001",
            "user1@example.com",
            OrderStatus::Processing,
        )],
        1.0,
    )));
    let producer = Arc::new(CapturingProducer::new());

    jobs::order_updates::check_order_statuses(orders.clone(), producer.clone()).await?;
    jobs::order_updates::check_order_statuses(orders.clone(), producer.clone()).await?;

    assert_eq!(
        producer.sent().await.len(),
        1,
        "An order updated seconds ago must not advance again"
    );

    Ok(())
}

/// Test: Delivered orders never publish further updates
#[tokio::test]
async fn test_delivered_order_is_terminal() -> Result<()> {
    let orders = Arc::new(Mutex::new(OrderBook::with_orders(
        vec![stale_order(
            "order1002",
            "user2@example.com",
            OrderStatus::Delivered,
        )],
        1.0,
    )));
    let producer = Arc::new(CapturingProducer::new());

    jobs::order_updates::check_order_statuses(orders, producer.clone()).await?;

    assert!(producer.sent().await.is_empty());

    Ok(())
}

/// Test: Publish failures are absorbed; the job neither panics nor errors
#[tokio::test]
async fn test_order_job_survives_publish_failure() -> Result<()> {
    let orders = Arc::new(Mutex::new(OrderBook::with_orders(
        vec![stale_order(
            "order1001",
            "user1@example.com",
            OrderStatus::Processing,
        )],
        1.0,
    )));
    let producer = Arc::new(CapturingProducer::rejecting());

    jobs::order_updates::check_order_statuses(orders, producer).await?;

    Ok(())
}

/// Test: Promotions go only to users who opted in
#[tokio::test]
async fn test_promotions_respect_preferences() -> Result<()> {
    let users = Arc::new(seeded_users());
    let producer = Arc::new(CapturingProducer::new());

    jobs::promotions::send_promotions(users, producer.clone()).await?;

    let sent = producer.sent().await;
    let recipients: Vec<&str> = sent.iter().map(|e| e.user_id.as_str()).collect();

    assert_eq!(recipients, vec!["user1@example.com", "user3@example.com"]);

    for envelope in &sent {
        assert_eq!(envelope.notification_type, NotificationType::Promotion);
        assert!(
            PROMOTIONS
                .iter()
                .any(|promotion| promotion.title == envelope.content.title)
        );
        assert!(envelope.content.link.is_some());
    }

    Ok(())
}

/// Test: Recommendations go only to users who opted in
#[tokio::test]
async fn test_recommendations_respect_preferences() -> Result<()> {
    let users = Arc::new(seeded_users());
    let producer = Arc::new(CapturingProducer::new());

    jobs::recommendations::send_recommendations(users, producer.clone()).await?;

    let sent = producer.sent().await;
    let recipients: Vec<&str> = sent.iter().map(|e| e.user_id.as_str()).collect();

    assert_eq!(recipients, vec!["user1@example.com", "user2@example.com"]);

    for envelope in &sent {
        assert_eq!(
            envelope.notification_type,
            NotificationType::Recommendation
        );
        assert!(!envelope.content.title.is_empty());
        assert!(!envelope.content.body.is_empty());
    }

    Ok(())
}

/// Test: An order book with zero advance probability never publishes
#[tokio::test]
async fn test_zero_probability_never_advances() -> Result<()> {
    let orders = Arc::new(Mutex::new(OrderBook::with_orders(
        vec![stale_order(
            "order1001",
            "user1@example.com",
            OrderStatus::Processing,
        )],
        0.0,
    )));
    let producer = Arc::new(CapturingProducer::new());

    for _ in 0..5 {
        jobs::order_updates::check_order_statuses(orders.clone(), producer.clone()).await?;
    }

    assert!(producer.sent().await.is_empty());

    Ok(())
}
