use std::sync::Arc;

use anyhow::{Error, Result};
use notification_pipeline::{
    api::{self, AppState},
    clients::{
        broker::ConnectionManager,
        consumer::ConsumerLoop,
        database::NotificationStore,
        publisher::EventPublisher,
    },
    config::Config,
    jobs,
    models::{
        broker::BrokerRole,
        domain::{OrderBook, seeded_users},
    },
    scheduler::JobScheduler,
    utils::retry_with_backoff,
};
use tokio::{
    sync::{Mutex, watch},
    time::{Duration, timeout},
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::load()?;
    info!("Configuration loaded");

    let store = retry_with_backoff(&config.retry_config(), || {
        NotificationStore::connect(&config.database_url)
    })
    .await?;
    let store = Arc::new(store);

    let producer_manager = Arc::new(ConnectionManager::new(
        config.broker_settings(),
        BrokerRole::Producer,
    ));
    let consumer_manager = Arc::new(ConnectionManager::new(
        config.broker_settings(),
        BrokerRole::Consumer,
    ));

    // Warm up both sides. Failures are tolerated here: the publisher and the
    // consumer loop each reconnect on demand.
    if let Err(e) = producer_manager.ensure_ready().await {
        warn!(error = %e, "Producer-side broker connection not ready at startup");
    }
    if let Err(e) = consumer_manager.ensure_ready().await {
        warn!(error = %e, "Consumer-side broker connection not ready at startup");
    }

    let publisher = Arc::new(EventPublisher::new(
        producer_manager.clone(),
        config.notification_exchange.clone(),
        config.notification_exchange_type,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let consumer = Arc::new(ConsumerLoop::new(
        consumer_manager.clone(),
        store.clone(),
        config.notification_queue.clone(),
        config.restart_policy(),
    ));
    let consumer_state = consumer.state();
    let consumer_handle = tokio::spawn({
        let consumer = consumer.clone();
        let shutdown_rx = shutdown_rx.clone();
        async move { consumer.run(shutdown_rx).await }
    });

    let mut scheduler = JobScheduler::new();
    let orders = Arc::new(Mutex::new(OrderBook::seeded()));
    let users = Arc::new(seeded_users());

    if config.order_update_job_enabled {
        let publisher = publisher.clone();
        let orders = orders.clone();
        scheduler.schedule(config.order_update_job(), move || {
            jobs::order_updates::check_order_statuses(orders.clone(), publisher.clone())
        });
    }

    if config.promotion_job_enabled {
        let publisher = publisher.clone();
        let users = users.clone();
        scheduler.schedule(config.promotion_job(), move || {
            jobs::promotions::send_promotions(users.clone(), publisher.clone())
        });
    }

    if config.recommendation_job_enabled {
        let publisher = publisher.clone();
        let users = users.clone();
        scheduler.schedule(config.recommendation_job(), move || {
            jobs::recommendations::send_recommendations(users.clone(), publisher.clone())
        });
    }

    scheduler.start();

    let api_state = AppState::new(
        producer_manager.state(),
        consumer_manager.state(),
        consumer_state,
        scheduler.running_state(),
    );
    let server_port = config.server_port;
    let api_handle = tokio::spawn(async move {
        if let Err(e) = api::run_api_server(server_port, api_state).await {
            error!(error = %e, "Health check server exited");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // Order matters: scheduler first (await in-flight job bodies), then the
    // consumer (bounded by the shutdown timeout), connections last.
    scheduler.stop().await;

    shutdown_tx.send_replace(true);
    let consumer_abort = consumer_handle.abort_handle();
    match timeout(
        Duration::from_secs(config.shutdown_timeout_seconds),
        consumer_handle,
    )
    .await
    {
        Ok(_) => info!("Consumer loop stopped"),
        Err(_) => {
            // Unacked deliveries are requeued by the broker on disconnect.
            warn!("Consumer loop did not stop within the shutdown timeout, aborting");
            consumer_abort.abort();
        }
    }

    api_handle.abort();

    consumer_manager.close().await;
    producer_manager.close().await;

    info!("Shutdown complete");

    Ok(())
}
