use serde::{Deserialize, Serialize};

/// Connection settings for the signaling relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// WebSocket URL of the relay server.
    pub url: String,
    /// Upper bound for a single connect attempt (valid range: 1-120).
    pub connect_timeout_secs: u32,
    /// First reconnect delay (valid range: 1-60).
    pub reconnect_delay_secs: u32,
    /// Backoff ceiling (valid range: reconnect_delay_secs-600).
    pub max_reconnect_delay_secs: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: "wss://localhost:8443/ws".into(),
            connect_timeout_secs: 15,
            reconnect_delay_secs: 1,
            max_reconnect_delay_secs: 30,
        }
    }
}
