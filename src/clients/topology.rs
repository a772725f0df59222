use lapin::{
    Channel,
    options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::FieldTable,
};
use tracing::debug;

use crate::models::{
    broker::{BrokerRole, BrokerSettings},
    error::BrokerError,
};

/// Declares the exchange and, on the consumer side, the queue and its
/// binding. Idempotent: redeclaring a matching entity is a broker no-op.
///
/// Runs as part of every transition into `Ready`, before any publish or
/// consume call is permitted against the channel.
pub async fn declare(
    channel: &Channel,
    settings: &BrokerSettings,
    role: BrokerRole,
) -> Result<(), BrokerError> {
    channel
        .exchange_declare(
            &settings.exchange,
            settings.exchange_type.kind(),
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(BrokerError::Topology)?;

    debug!(exchange = %settings.exchange, "Exchange declared");

    if role == BrokerRole::Consumer {
        channel
            .queue_declare(
                &settings.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(BrokerError::Topology)?;

        channel
            .queue_bind(
                &settings.queue,
                &settings.exchange,
                &settings.binding_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(BrokerError::Topology)?;

        debug!(
            queue = %settings.queue,
            exchange = %settings.exchange,
            binding_key = %settings.binding_key,
            "Queue declared and bound"
        );
    }

    Ok(())
}
