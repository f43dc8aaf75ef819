//! Peer-connection capability boundary.
//!
//! The media side of a call (SDP generation, ICE gathering, tracks) lives
//! behind these traits. One [`PeerConnection`] is created per call session
//! and reports asynchronous happenings back through a [`PeerEvent`] channel.

use std::sync::Arc;

use async_trait::async_trait;
use beamlink_common::ShareCode;
use tokio::sync::mpsc;

use crate::protocol::{IceCandidate, SessionDescription};
use crate::session::Role;

/// Failure reported by the capability. Opaque to the signaling core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct PeerError(pub String);

impl PeerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Handle describing a remote media track that started arriving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub stream_id: String,
    pub track_id: String,
}

/// Events raised by a peer connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// A local ICE candidate was gathered and should be trickled to the peer.
    LocalCandidate(IceCandidate),
    /// Remote media arrived.
    RemoteTrack(RemoteTrack),
    /// Local capture stopped (e.g. the user ended the screen share).
    TrackEnded,
    /// Media connectivity is up.
    Connected,
    /// Media connectivity failed irrecoverably.
    Failed,
}

#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, PeerError>;

    async fn create_answer(&self) -> Result<SessionDescription, PeerError>;

    async fn set_local_description(&self, description: SessionDescription)
        -> Result<(), PeerError>;

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError>;

    /// Stop local tracks and release the connection.
    async fn close(&self) -> Result<(), PeerError>;
}

/// Creates the capability instance for a new call session.
#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    async fn create(
        &self,
        share_code: &ShareCode,
        role: Role,
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Arc<dyn PeerConnection>, PeerError>;
}
