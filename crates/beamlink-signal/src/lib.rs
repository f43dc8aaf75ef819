//! Screen-share signaling client.
//!
//! Carries offer/answer/candidate negotiation for peer-to-peer screen
//! sharing over a relay: a JSON message codec, a reconnecting WebSocket
//! transport, a per-share-code negotiation state machine, a session
//! registry, and the call controller that wires them to a UI surface.

pub mod controller;
pub mod peer;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod transport;
pub mod ui;

#[cfg(test)]
mod testing;

pub use controller::{CallController, ClientMode, ControllerConfig, UiIntent};
pub use peer::{PeerConnection, PeerConnectionFactory, PeerError, PeerEvent, RemoteTrack};
pub use protocol::{
    decode, encode, IceCandidate, SdpType, SessionDescription, SignalingMessage,
};
pub use registry::SessionRegistry;
pub use session::{CallEvent, CloseReason, Phase, Role, SessionConfig, SessionInput};
pub use transport::{Outbox, TransportClient, TransportCommand, TransportConfig, TransportEvent};
pub use ui::{CallSurface, LoggingSurface};
