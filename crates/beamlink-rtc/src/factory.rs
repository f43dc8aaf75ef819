use std::sync::Arc;

use async_trait::async_trait;
use beamlink_common::ShareCode;
use beamlink_signal::{
    PeerConnection, PeerConnectionFactory, PeerError, PeerEvent, RemoteTrack, Role,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MediaEngine, MIME_TYPE_VP8};
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

use crate::convert::{from_rtc_candidate, peer_error};
use crate::peer::RtcPeer;

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds webrtc-rs peer connections for call sessions.
#[derive(Debug, Clone)]
pub struct RtcPeerFactory {
    ice_servers: Vec<String>,
    capture: bool,
}

impl RtcPeerFactory {
    pub fn new(ice_servers: Vec<String>) -> Self {
        Self {
            ice_servers,
            capture: false,
        }
    }

    /// Attach a local video track to sessions this side offers.
    pub fn with_capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    async fn new_connection(&self) -> Result<RTCPeerConnection, webrtc::Error> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let ice_servers = if self.ice_servers.is_empty() {
            vec![]
        } else {
            vec![RTCIceServer {
                urls: self.ice_servers.clone(),
                ..Default::default()
            }]
        };

        api.new_peer_connection(RTCConfiguration {
            ice_servers,
            ..Default::default()
        })
        .await
    }

    /// Add the outgoing screen track. `TrackEnded` is raised once its sender
    /// stops, which happens when the connection is closed or the track is
    /// removed. Samples are written by the capture source, not here.
    async fn attach_video_track(
        connection: &RTCPeerConnection,
        share_code: &ShareCode,
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<(), webrtc::Error> {
        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_string(),
                ..Default::default()
            },
            format!("screen-{}", uuid::Uuid::new_v4()),
            format!("beamlink-{share_code}"),
        ));
        let rtp_sender = connection
            .add_track(track as Arc<dyn TrackLocal + Send + Sync>)
            .await?;

        // RTCP must be read for the interceptors to work.
        let code = share_code.clone();
        tokio::spawn(async move {
            let mut rtcp_buf = vec![0u8; 1500];
            while rtp_sender.read(&mut rtcp_buf).await.is_ok() {}
            debug!(share_code = %code, "Local track sender stopped");
            let _ = events.send(PeerEvent::TrackEnded).await;
        });

        Ok(())
    }
}

#[async_trait]
impl PeerConnectionFactory for RtcPeerFactory {
    async fn create(
        &self,
        share_code: &ShareCode,
        role: Role,
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Arc<dyn PeerConnection>, PeerError> {
        let connection = Arc::new(self.new_connection().await.map_err(peer_error)?);

        let capture = self.capture && role == Role::Offerer;
        if capture {
            Self::attach_video_track(&connection, share_code, events.clone())
                .await
                .map_err(peer_error)?;
        }

        register_callbacks(&connection, share_code, events);
        info!(share_code = %share_code, role = %role, capture, "Peer connection created");

        Ok(Arc::new(RtcPeer::new(share_code.clone(), connection)))
    }
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

fn register_callbacks(
    connection: &RTCPeerConnection,
    share_code: &ShareCode,
    events: mpsc::Sender<PeerEvent>,
) {
    let state_tx = events.clone();
    let state_code = share_code.clone();
    connection.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
        let tx = state_tx.clone();
        let code = state_code.clone();
        Box::pin(async move {
            debug!(share_code = %code, state = %s, "Peer connection state changed");
            let event = match s {
                RTCPeerConnectionState::Connected => PeerEvent::Connected,
                RTCPeerConnectionState::Failed => PeerEvent::Failed,
                _ => return,
            };
            let _ = tx.send(event).await;
        })
    }));

    let ice_tx = events.clone();
    let ice_code = share_code.clone();
    connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
        let tx = ice_tx.clone();
        let code = ice_code.clone();
        Box::pin(async move {
            let Some(candidate) = c else { return };
            match candidate.to_json() {
                Ok(init) => {
                    let _ = tx
                        .send(PeerEvent::LocalCandidate(from_rtc_candidate(init)))
                        .await;
                }
                Err(e) => warn!(share_code = %code, error = %e, "Could not serialize local candidate"),
            }
        })
    }));

    let track_tx = events;
    connection.on_track(Box::new(move |track, _receiver, _transceiver| {
        let tx = track_tx.clone();
        Box::pin(async move {
            let remote = RemoteTrack {
                stream_id: track.stream_id(),
                track_id: track.id(),
            };
            let _ = tx.send(PeerEvent::RemoteTrack(remote)).await;
        })
    }));
}
