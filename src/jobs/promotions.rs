use std::sync::Arc;

use anyhow::{Error, Result};
use tracing::{debug, info};

use crate::{
    clients::publisher::MessageProducer,
    models::{
        domain::{UserProfile, pick_promotion},
        envelope::{Envelope, EnvelopeContent, NotificationType},
    },
};

/// Fans one randomly picked promotion out to every user who opted in.
pub async fn send_promotions(
    users: Arc<Vec<UserProfile>>,
    producer: Arc<dyn MessageProducer>,
) -> Result<(), Error> {
    info!("Running promotional notifications job");

    let promotion = pick_promotion();
    let mut targeted = 0;
    let mut published = 0;

    for user in users.iter() {
        if !user.preferences.promotions {
            debug!(user_id = %user.user_id, "User opted out of promotions, skipping");
            continue;
        }

        targeted += 1;

        let envelope = Envelope::new(
            user.user_id.clone(),
            NotificationType::Promotion,
            EnvelopeContent::new(promotion.title, promotion.body).with_link(promotion.link),
        );

        if producer.publish(&envelope).await {
            published += 1;
        }
    }

    info!(targeted, published, "Promotional notifications job finished");

    Ok(())
}
