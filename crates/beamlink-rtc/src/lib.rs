//! Peer-connection capability backed by webrtc-rs.
//!
//! [`RtcPeerFactory`] creates one `RTCPeerConnection` per call session and
//! forwards its ICE, track and connection-state callbacks as
//! [`PeerEvent`](beamlink_signal::PeerEvent)s.

mod convert;
mod factory;
mod peer;

pub use factory::RtcPeerFactory;
pub use peer::RtcPeer;
