//! Transport configuration, commands and events.

use crate::protocol::SignalingMessage;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Relay WebSocket URL (`ws://` or `wss://`).
    pub url: String,
    pub connect_timeout_secs: u64,
    pub reconnect_delay_secs: u64,
    pub max_reconnect_delay_secs: u64,
    /// Capacity of the command and event channels.
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: "wss://localhost:8443/ws".to_string(),
            connect_timeout_secs: 15,
            reconnect_delay_secs: 1,
            max_reconnect_delay_secs: 30,
            channel_capacity: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// Commands & Events
// ---------------------------------------------------------------------------

/// Instructions for the background connection task.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    Send(SignalingMessage),
    Disconnect,
}

/// Events emitted by the connection task.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    /// `login` was written to a fresh connection.
    LoggedIn { name: String },
    Message(SignalingMessage),
    Disconnected,
    Error(String),
}
