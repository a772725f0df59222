use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

/// Minimum time between status changes for a single order.
const STATUS_HOLD_SECONDS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Processing,
    Shipped,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
        }
    }

    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Processing => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Order {
    pub order_id: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub last_update: DateTime<Utc>,
}

/// In-memory order state walked by the order-status job. Stands in for the
/// order domain service; only the publish-on-transition behavior matters here.
#[derive(Debug)]
pub struct OrderBook {
    orders: HashMap<String, Order>,
    advance_probability: f64,
}

impl OrderBook {
    pub fn seeded() -> Self {
        let now = Utc::now();
        let seed = [
            ("order1001", "user1@example.com", OrderStatus::Processing),
            ("order1002", "user2@example.com", OrderStatus::Shipped),
            ("order1003", "user1@example.com", OrderStatus::Shipped),
            ("order1004", "user3@example.com", OrderStatus::Processing),
        ];

        let orders = seed
            .into_iter()
            .map(|(order_id, user_id, status)| Order {
                order_id: order_id.to_string(),
                user_id: user_id.to_string(),
                status,
                last_update: now,
            })
            .collect();

        Self::with_orders(orders, 0.3)
    }

    pub fn with_orders(orders: Vec<Order>, advance_probability: f64) -> Self {
        Self {
            orders: orders
                .into_iter()
                .map(|order| (order.order_id.clone(), order))
                .collect(),
            advance_probability,
        }
    }

    pub fn order_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.orders.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn get(&self, order_id: &str) -> Option<&Order> {
        self.orders.get(order_id)
    }

    /// Simulates checking one order, advancing it along
    /// processing -> shipped -> delivered with the configured probability.
    /// Returns the updated order, or None when nothing changed.
    pub fn advance(&mut self, order_id: &str, now: DateTime<Utc>) -> Option<Order> {
        let order = self.orders.get_mut(order_id)?;

        if now - order.last_update < Duration::seconds(STATUS_HOLD_SECONDS) {
            return None;
        }

        let next = order.status.next()?;

        if rand::random_range(0.0..1.0) < self.advance_probability {
            order.status = next;
            order.last_update = now;
            return Some(order.clone());
        }

        None
    }
}

#[derive(Debug, Clone)]
pub struct Preferences {
    pub promotions: bool,
    pub order_updates: bool,
    pub recommendations: bool,
}

#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user_id: String,
    pub preferences: Preferences,
}

pub fn seeded_users() -> Vec<UserProfile> {
    vec![
        UserProfile {
            user_id: "user1@example.com".to_string(),
            preferences: Preferences {
                promotions: true,
                order_updates: true,
                recommendations: true,
            },
        },
        UserProfile {
            user_id: "user2@example.com".to_string(),
            preferences: Preferences {
                promotions: false,
                order_updates: true,
                recommendations: true,
            },
        },
        UserProfile {
            user_id: "user3@example.com".to_string(),
            preferences: Preferences {
                promotions: true,
                order_updates: false,
                recommendations: false,
            },
        },
    ]
}

#[derive(Debug, Clone)]
pub struct Promotion {
    pub title: &'static str,
    pub body: &'static str,
    pub link: &'static str,
}

pub const PROMOTIONS: &[Promotion] = &[
    Promotion {
        title: "Flash Sale!",
        body: "Get 20% off electronics today!",
        link: "/promotions/flash_sale",
    },
    Promotion {
        title: "New Arrivals",
        body: "Check out the latest fashion trends.",
        link: "/collections/new",
    },
    Promotion {
        title: "Free Shipping Weekend",
        body: "Enjoy free shipping on all orders over $50.",
        link: "/",
    },
];

pub fn pick_promotion() -> &'static Promotion {
    &PROMOTIONS[rand::random_range(0..PROMOTIONS.len())]
}
