use lapin::{Channel, Connection, ConnectionProperties, options::BasicQosOptions};
use tokio::{
    sync::{Mutex, watch},
    time::timeout,
};
use tracing::{info, warn};

use crate::{
    clients::topology,
    models::{
        broker::{BrokerRole, BrokerSettings, ConnectionState},
        error::BrokerError,
    },
};

#[derive(Default)]
struct Handles {
    connection: Option<Connection>,
    channel: Option<Channel>,
}

/// Exclusive owner of the broker connection and channel for one role.
/// Publisher and consumer borrow a channel clone only while `Ready` and must
/// re-acquire through `ensure_ready` after any transition out of it.
pub struct ConnectionManager {
    role: BrokerRole,
    settings: BrokerSettings,
    handles: Mutex<Handles>,
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectionManager {
    pub fn new(settings: BrokerSettings, role: BrokerRole) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            role,
            settings,
            handles: Mutex::new(Handles::default()),
            state_tx,
        }
    }

    /// Returns a channel in `Ready` state, connecting first if necessary.
    ///
    /// All callers serialize on the handle lock, so at most one connection
    /// attempt runs at a time; callers queued behind an attempt observe its
    /// outcome instead of starting their own. A failed attempt leaves no
    /// partially-initialized handles behind and does not loop-retry; the
    /// caller decides whether to try again.
    pub async fn ensure_ready(&self) -> Result<Channel, BrokerError> {
        let mut handles = self.handles.lock().await;

        if *self.state_tx.borrow() == ConnectionState::Ready {
            if let Some(channel) = handles.channel.as_ref() {
                if channel.status().connected() {
                    return Ok(channel.clone());
                }
            }
        }

        // Anything left over is stale or half-initialized.
        handles.connection = None;
        handles.channel = None;
        self.transition(ConnectionState::Connecting);

        match self.connect().await {
            Ok((connection, channel)) => {
                handles.connection = Some(connection);
                handles.channel = Some(channel.clone());
                self.transition(ConnectionState::Ready);
                Ok(channel)
            }
            Err(e) => {
                self.transition(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    async fn connect(&self) -> Result<(Connection, Channel), BrokerError> {
        info!(role = %self.role, "Connecting to RabbitMQ");

        let connection = timeout(
            self.settings.connect_timeout,
            Connection::connect(&self.settings.url, ConnectionProperties::default()),
        )
        .await
        .map_err(|_| BrokerError::Connection("connection attempt timed out".to_string()))?
        .map_err(|e| BrokerError::Connection(e.to_string()))?;

        // Broker-initiated closure flips the state immediately so the next
        // ensure_ready call triggers a fresh attempt.
        let state_tx = self.state_tx.clone();
        let role = self.role;
        connection.on_error(move |error| {
            warn!(role = %role, error = %error, "Broker connection lost");
            state_tx.send_replace(ConnectionState::Disconnected);
        });

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        if self.role == BrokerRole::Consumer {
            channel
                .basic_qos(self.settings.prefetch_count, BasicQosOptions::default())
                .await
                .map_err(|e| BrokerError::Connection(e.to_string()))?;
        }

        topology::declare(&channel, &self.settings, self.role).await?;

        Ok((connection, channel))
    }

    /// External failure signal, used by the publisher when a publish call
    /// fails on a channel that still looked connected.
    pub fn mark_disconnected(&self) {
        self.transition(ConnectionState::Disconnected);
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn current_state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Shutdown only; channel first, then connection.
    pub async fn close(&self) {
        let mut handles = self.handles.lock().await;

        if let Some(channel) = handles.channel.take() {
            if let Err(e) = channel.close(200, "shutting down").await {
                warn!(role = %self.role, error = %e, "Error closing channel");
            }
        }

        if let Some(connection) = handles.connection.take() {
            if let Err(e) = connection.close(200, "shutting down").await {
                warn!(role = %self.role, error = %e, "Error closing connection");
            }
        }

        self.transition(ConnectionState::Disconnected);
    }

    fn transition(&self, to: ConnectionState) {
        let from = *self.state_tx.borrow();
        if from != to {
            info!(role = %self.role, from = %from, to = %to, "Connection state changed");
        }
        self.state_tx.send_replace(to);
    }
}
