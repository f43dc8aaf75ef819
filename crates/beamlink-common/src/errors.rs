use std::path::PathBuf;

use crate::id::ShareCode;

/// Inbound wire text that could not be turned into a signaling message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("unknown channel: {0}")]
    UnknownChannel(String),
}

#[derive(Debug, thiserror::Error)]
#[error("failed to encode {channel} message: {source}")]
pub struct EncodeError {
    pub channel: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// A message that decoded fine but cannot be delivered to a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("{channel} message has no share code")]
    MissingShareCode { channel: &'static str },

    #[error("no active session for share code {0}")]
    UnknownSession(ShareCode),

    #[error("session {0} is already negotiating")]
    SessionBusy(ShareCode),

    #[error("{0} is not a call message")]
    NotCallMessage(&'static str),

    #[error("{action} not permitted in {mode} mode")]
    RoleNotPermitted {
        action: &'static str,
        mode: &'static str,
    },
}

/// Failure while negotiating one call. Always closes the affected session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NegotiationError {
    #[error("{step} failed: {message}")]
    Capability { step: &'static str, message: String },

    #[error("session {share_code} received {channel} while {phase}")]
    OutOfOrder {
        share_code: ShareCode,
        channel: &'static str,
        phase: String,
    },

    #[error("session {share_code} timed out while {phase}")]
    Timeout { share_code: ShareCode, phase: String },

    #[error("peer connection for {0} failed")]
    PeerConnectionFailed(ShareCode),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,

    #[error("transport channel closed")]
    ChannelClosed,

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("connect timed out after {0}s")]
    Timeout(u64),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BeamlinkError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
