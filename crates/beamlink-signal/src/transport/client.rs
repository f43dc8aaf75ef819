//! Public handle for the relay connection.

use std::sync::Arc;

use beamlink_common::ParticipantIdentity;
use tokio::sync::{mpsc, RwLock};

use super::connection::connection_loop;
use super::outbox::Outbox;
use super::types::{TransportCommand, TransportConfig, TransportEvent};

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle for the background relay connection.
///
/// All methods are non-blocking and send commands to the connection task.
pub struct TransportClient {
    command_tx: mpsc::Sender<TransportCommand>,
    connected: Arc<RwLock<bool>>,
}

impl TransportClient {
    /// Start the background connection. Returns `(client, event_receiver)`.
    ///
    /// `identity` is announced with `login` each time a connection opens.
    pub fn connect(
        config: TransportConfig,
        identity: ParticipantIdentity,
    ) -> (Self, mpsc::Receiver<TransportEvent>) {
        let capacity = config.channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let (command_tx, command_rx) = mpsc::channel(capacity);
        let connected = Arc::new(RwLock::new(false));

        let client = Self {
            command_tx,
            connected: Arc::clone(&connected),
        };

        tokio::spawn(connection_loop(
            config, identity, connected, event_tx, command_rx,
        ));

        (client, event_rx)
    }

    /// A send handle sharing this connection.
    pub fn outbox(&self) -> Outbox {
        Outbox::from_sender(self.command_tx.clone())
    }

    pub async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }

    /// Close the socket and stop reconnecting.
    pub async fn disconnect(&self) {
        let _ = self.command_tx.send(TransportCommand::Disconnect).await;
    }
}
