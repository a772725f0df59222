use std::sync::Arc;

use anyhow::{Error, Result};
use tracing::{debug, info};

use crate::{
    clients::publisher::MessageProducer,
    models::{
        domain::UserProfile,
        envelope::{Envelope, EnvelopeContent, NotificationType},
    },
};

const TITLES: &[&str] = &[
    "Recommended: New Laptops",
    "Based on your shopping: Headphones",
    "Flash Sale: Gaming Chairs",
    "Exclusive: Smartwatches",
];

const BODIES: &[&str] = &[
    "Get your favorite tech products now!",
    "Trending picks just for you.",
    "Don't miss out on this limited-time deal.",
    "Your style, your price. Shop now.",
];

/// Fans a randomly assembled recommendation out to every user who opted in.
pub async fn send_recommendations(
    users: Arc<Vec<UserProfile>>,
    producer: Arc<dyn MessageProducer>,
) -> Result<(), Error> {
    info!("Running recommendation notifications job");

    let mut published = 0;

    for user in users.iter() {
        if !user.preferences.recommendations {
            debug!(user_id = %user.user_id, "User opted out of recommendations, skipping");
            continue;
        }

        let title = TITLES[rand::random_range(0..TITLES.len())];
        let body = BODIES[rand::random_range(0..BODIES.len())];

        let envelope = Envelope::new(
            user.user_id.clone(),
            NotificationType::Recommendation,
            EnvelopeContent::new(title, body).with_link("/recommendations"),
        );

        if producer.publish(&envelope).await {
            published += 1;
        }
    }

    info!(published, "Recommendation notifications job finished");

    Ok(())
}
