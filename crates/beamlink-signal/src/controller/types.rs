use std::fmt;

use beamlink_common::ShareCode;

use crate::session::SessionConfig;

/// Which calls a client takes part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientMode {
    /// Starts calls and accepts incoming ones.
    #[default]
    Both,
    /// Starts calls only; incoming calls are refused.
    Sharer,
    /// Accepts incoming calls only; local start is refused.
    Viewer,
}

impl ClientMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientMode::Both => "both",
            ClientMode::Sharer => "sharer",
            ClientMode::Viewer => "viewer",
        }
    }

    pub fn can_start(&self) -> bool {
        !matches!(self, ClientMode::Viewer)
    }

    pub fn accepts_incoming(&self) -> bool {
        !matches!(self, ClientMode::Sharer)
    }
}

impl fmt::Display for ClientMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ControllerConfig {
    pub mode: ClientMode,
    pub session: SessionConfig,
}

/// Requests coming from the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiIntent {
    StartSharing(ShareCode),
    StopSharing(ShareCode),
    StopAll,
}
