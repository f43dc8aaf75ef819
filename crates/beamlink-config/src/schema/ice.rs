use serde::{Deserialize, Serialize};

/// ICE servers handed to the peer-connection adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IceConfig {
    pub servers: Vec<String>,
}

impl Default for IceConfig {
    fn default() -> Self {
        Self {
            servers: vec!["stun:stun.stunprotocol.org".into()],
        }
    }
}
