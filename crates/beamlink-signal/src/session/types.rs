//! Session roles, phases, inputs and lifecycle events.

use std::fmt;
use std::time::Duration;

use beamlink_common::{NegotiationError, ShareCode};

use crate::peer::{PeerEvent, RemoteTrack};
use crate::protocol::SignalingMessage;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Which half of the offer/answer exchange a session plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Offerer,
    Answerer,
    Unset,
}

impl Role {
    /// Decide the role from the input that creates a session.
    ///
    /// A local start or a received `start_call` makes this side generate the
    /// offer. An offer or an early candidate means the remote side is
    /// calling and this side answers.
    pub fn for_first_input(input: &SessionInput) -> Self {
        match input {
            SessionInput::Start => Role::Offerer,
            SessionInput::Remote(SignalingMessage::StartCall { .. }) => Role::Offerer,
            SessionInput::Remote(SignalingMessage::WebrtcOffer { .. }) => Role::Answerer,
            SessionInput::Remote(SignalingMessage::WebrtcIceCandidate { .. }) => Role::Answerer,
            _ => Role::Unset,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Offerer => "offerer",
            Role::Answerer => "answerer",
            Role::Unset => "unset",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingLocalDescription,
    AwaitingRemoteDescription,
    /// Answer sent; remote candidates are applied as they arrive.
    Negotiating,
    Established,
    /// Terminal. A later call on the same share code gets a new session.
    Closed,
}

impl Phase {
    /// Phases bounded by the negotiation timeout.
    pub fn is_negotiating(&self) -> bool {
        matches!(
            self,
            Phase::AwaitingLocalDescription | Phase::AwaitingRemoteDescription | Phase::Negotiating
        )
    }

    pub fn is_closed(&self) -> bool {
        *self == Phase::Closed
    }

    /// Phases bounded by the negotiation timeout, including an answerer
    /// still waiting for the offer.
    pub fn has_deadline(&self) -> bool {
        *self == Phase::Idle || self.is_negotiating()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "Idle",
            Phase::AwaitingLocalDescription => "AwaitingLocalDescription",
            Phase::AwaitingRemoteDescription => "AwaitingRemoteDescription",
            Phase::Negotiating => "Negotiating",
            Phase::Established => "Established",
            Phase::Closed => "Closed",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Everything a session reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    /// Local UI asked to start sharing to this share code.
    Start,
    /// A routed message from the relay.
    Remote(SignalingMessage),
    /// An event raised by this session's peer connection.
    Peer(PeerEvent),
    /// Local UI asked to stop.
    Stop,
    /// The relay connection dropped.
    TransportLost,
    /// The negotiation deadline passed.
    Timeout,
    /// A new call on the same share code replaced this one before it opened.
    Abandon,
}

impl SessionInput {
    /// Inputs that would begin a new negotiation.
    pub fn is_start(&self) -> bool {
        matches!(
            self,
            SessionInput::Start | SessionInput::Remote(SignalingMessage::StartCall { .. })
        )
    }
}

// ---------------------------------------------------------------------------
// Lifecycle events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum CloseReason {
    LocalStop,
    TrackEnded,
    RemoteClosed,
    TransportLost,
    /// Never received its opening message, or was replaced before it did.
    Abandoned,
    Failed(NegotiationError),
}

impl CloseReason {
    /// Whether the peer should be told with a `webrtc_close`.
    pub fn notifies_peer(&self) -> bool {
        matches!(
            self,
            CloseReason::LocalStop | CloseReason::TrackEnded | CloseReason::Failed(_)
        )
    }
}

/// Reported by sessions to the call controller.
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    Started {
        share_code: ShareCode,
        role: Role,
    },
    RemoteStream {
        share_code: ShareCode,
        track: RemoteTrack,
    },
    Established {
        share_code: ShareCode,
    },
    Failed {
        share_code: ShareCode,
        error: NegotiationError,
    },
    Closed {
        share_code: ShareCode,
        session_id: u64,
        reason: CloseReason,
    },
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bound on the idle and negotiating phases. `None` disables the deadline.
    pub negotiation_timeout: Option<Duration>,
    /// Capacity of the per-session input and event channels.
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            negotiation_timeout: Some(Duration::from_secs(30)),
            channel_capacity: 256,
        }
    }
}
