//! Call negotiation settings.

use serde::{Deserialize, Serialize};

/// Which call roles this client takes part in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CallMode {
    /// Starts shares and answers incoming ones.
    #[default]
    Both,
    /// Only starts shares; incoming calls are refused.
    Sharer,
    /// Only answers incoming calls.
    Viewer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    pub mode: CallMode,
    /// Seconds a session may spend negotiating before it is closed.
    /// 0 disables the timeout (valid range otherwise: 5-600).
    pub negotiation_timeout_secs: u32,
    /// Capacity of internal event channels (valid range: 16-4096).
    pub event_buffer: u32,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            mode: CallMode::Both,
            negotiation_timeout_secs: 30,
            event_buffer: 256,
        }
    }
}
