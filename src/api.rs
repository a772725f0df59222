use std::sync::Arc;

use anyhow::{Error, Result};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use chrono::Utc;
use tokio::{net::TcpListener, sync::watch};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::models::{
    broker::ConnectionState,
    health::{ConsumerState, StatusSnapshot},
};

/// Watch handles onto the live components. The endpoint only reads their
/// current values; it never probes or mutates anything.
pub struct AppState {
    producer_connection: watch::Receiver<ConnectionState>,
    consumer_connection: watch::Receiver<ConnectionState>,
    consumer_loop: watch::Receiver<ConsumerState>,
    scheduler_running: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(
        producer_connection: watch::Receiver<ConnectionState>,
        consumer_connection: watch::Receiver<ConnectionState>,
        consumer_loop: watch::Receiver<ConsumerState>,
        scheduler_running: watch::Receiver<bool>,
    ) -> Self {
        Self {
            producer_connection,
            consumer_connection,
            consumer_loop,
            scheduler_running,
        }
    }

    fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            producer_connection: *self.producer_connection.borrow(),
            consumer_connection: *self.consumer_connection.borrow(),
            consumer_loop: *self.consumer_loop.borrow(),
            scheduler_running: *self.scheduler_running.borrow(),
            timestamp: Utc::now(),
        }
    }
}

pub async fn run_api_server(port: u16, state: AppState) -> Result<(), Error> {
    let app = Router::new()
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state));

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!(address = %addr, "Health check server started");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot();

    let status_code = if snapshot.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(snapshot))
}
