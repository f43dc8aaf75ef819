use std::sync::Arc;

use async_trait::async_trait;
use beamlink_common::ShareCode;
use beamlink_signal::{IceCandidate, PeerConnection, PeerError, SessionDescription};
use tracing::debug;
use webrtc::peer_connection::RTCPeerConnection;

use crate::convert::{from_rtc_description, peer_error, to_rtc_candidate, to_rtc_description};

/// One webrtc-rs peer connection serving a single call session.
pub struct RtcPeer {
    share_code: ShareCode,
    connection: Arc<RTCPeerConnection>,
}

impl RtcPeer {
    pub(crate) fn new(share_code: ShareCode, connection: Arc<RTCPeerConnection>) -> Self {
        Self {
            share_code,
            connection,
        }
    }
}

#[async_trait]
impl PeerConnection for RtcPeer {
    async fn create_offer(&self) -> Result<SessionDescription, PeerError> {
        let offer = self
            .connection
            .create_offer(None)
            .await
            .map_err(peer_error)?;
        from_rtc_description(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription, PeerError> {
        let answer = self
            .connection
            .create_answer(None)
            .await
            .map_err(peer_error)?;
        from_rtc_description(answer)
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError> {
        self.connection
            .set_local_description(to_rtc_description(description)?)
            .await
            .map_err(peer_error)
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError> {
        self.connection
            .set_remote_description(to_rtc_description(description)?)
            .await
            .map_err(peer_error)
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError> {
        self.connection
            .add_ice_candidate(to_rtc_candidate(candidate))
            .await
            .map_err(peer_error)
    }

    async fn close(&self) -> Result<(), PeerError> {
        debug!(share_code = %self.share_code, "Closing peer connection");
        self.connection.close().await.map_err(peer_error)
    }
}
