//! Scripted capability doubles shared by the unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use beamlink_common::ShareCode;
use tokio::sync::{mpsc, watch};

use crate::peer::{PeerConnection, PeerConnectionFactory, PeerError, PeerEvent, RemoteTrack};
use crate::protocol::{IceCandidate, SdpType, SessionDescription, SignalingMessage};
use crate::session::{CallEvent, Phase, Role};
use crate::transport::TransportCommand;
use crate::ui::CallSurface;

pub(crate) const WAIT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Mock peer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PeerCall {
    CreateOffer,
    CreateAnswer,
    SetLocal(SdpType),
    SetRemote(SdpType),
    AddCandidate(String),
    Close,
}

pub(crate) struct MockPeer {
    share_code: ShareCode,
    calls: Mutex<Vec<PeerCall>>,
    fail_on: Option<&'static str>,
}

impl MockPeer {
    pub(crate) fn calls(&self) -> Vec<PeerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, call: &PeerCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    fn record(&self, step: &'static str, call: PeerCall) -> Result<(), PeerError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_on == Some(step) {
            return Err(PeerError::new(format!("{step} rejected")));
        }
        Ok(())
    }
}

#[async_trait]
impl PeerConnection for MockPeer {
    async fn create_offer(&self) -> Result<SessionDescription, PeerError> {
        self.record("createOffer", PeerCall::CreateOffer)?;
        Ok(SessionDescription::offer(format!("offer-{}", self.share_code)))
    }

    async fn create_answer(&self) -> Result<SessionDescription, PeerError> {
        self.record("createAnswer", PeerCall::CreateAnswer)?;
        Ok(SessionDescription::answer(format!("answer-{}", self.share_code)))
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError> {
        self.record("setLocalDescription", PeerCall::SetLocal(description.kind))
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError> {
        self.record("setRemoteDescription", PeerCall::SetRemote(description.kind))
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError> {
        self.record("addIceCandidate", PeerCall::AddCandidate(candidate.candidate))
    }

    async fn close(&self) -> Result<(), PeerError> {
        self.record("close", PeerCall::Close)
    }
}

// ---------------------------------------------------------------------------
// Mock factory
// ---------------------------------------------------------------------------

struct Created {
    share_code: ShareCode,
    role: Role,
    peer: Arc<MockPeer>,
    events: mpsc::Sender<PeerEvent>,
}

#[derive(Default)]
pub(crate) struct MockPeerFactory {
    created: Mutex<Vec<Created>>,
    fail_on: Option<&'static str>,
    refuse: bool,
}

impl MockPeerFactory {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Peers whose capability call named `step` fails.
    pub(crate) fn failing(step: &'static str) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(step),
            ..Self::default()
        })
    }

    /// A factory that cannot create peers at all.
    pub(crate) fn refusing() -> Arc<Self> {
        Arc::new(Self {
            refuse: true,
            ..Self::default()
        })
    }

    /// Most recent peer created for `share_code`.
    pub(crate) fn peer(&self, share_code: &str) -> Arc<MockPeer> {
        let created = self.created.lock().unwrap();
        let entry = created
            .iter()
            .rev()
            .find(|c| c.share_code.as_str() == share_code)
            .expect("no peer created for share code");
        Arc::clone(&entry.peer)
    }

    pub(crate) fn role(&self, share_code: &str) -> Role {
        let created = self.created.lock().unwrap();
        created
            .iter()
            .rev()
            .find(|c| c.share_code.as_str() == share_code)
            .map(|c| c.role)
            .expect("no peer created for share code")
    }

    /// Raise a capability event on the most recent peer for `share_code`.
    pub(crate) async fn raise(&self, share_code: &str, event: PeerEvent) {
        let tx = {
            let created = self.created.lock().unwrap();
            created
                .iter()
                .rev()
                .find(|c| c.share_code.as_str() == share_code)
                .map(|c| c.events.clone())
                .expect("no peer created for share code")
        };
        tx.send(event).await.unwrap();
    }

    pub(crate) fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

#[async_trait]
impl PeerConnectionFactory for MockPeerFactory {
    async fn create(
        &self,
        share_code: &ShareCode,
        role: Role,
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Arc<dyn PeerConnection>, PeerError> {
        if self.refuse {
            return Err(PeerError::new("no capture device"));
        }
        let peer = Arc::new(MockPeer {
            share_code: share_code.clone(),
            calls: Mutex::new(Vec::new()),
            fail_on: self.fail_on,
        });
        self.created.lock().unwrap().push(Created {
            share_code: share_code.clone(),
            role,
            peer: Arc::clone(&peer),
            events,
        });
        Ok(peer)
    }
}

// ---------------------------------------------------------------------------
// Recording surface
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SurfaceCall {
    Show(String),
    Hide(String),
    Display(String, String),
    Clear(String),
}

#[derive(Default)]
pub(crate) struct RecordingSurface {
    calls: Mutex<Vec<SurfaceCall>>,
}

impl RecordingSurface {
    pub(crate) fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl CallSurface for RecordingSurface {
    fn show_call_surface(&self, share_code: &ShareCode) {
        self.calls
            .lock()
            .unwrap()
            .push(SurfaceCall::Show(share_code.to_string()));
    }

    fn hide_call_surface(&self, share_code: &ShareCode) {
        self.calls
            .lock()
            .unwrap()
            .push(SurfaceCall::Hide(share_code.to_string()));
    }

    fn display_remote_stream(&self, share_code: &ShareCode, track: &RemoteTrack) {
        self.calls.lock().unwrap().push(SurfaceCall::Display(
            share_code.to_string(),
            track.track_id.clone(),
        ));
    }

    fn clear_local_media(&self, share_code: &ShareCode) {
        self.calls
            .lock()
            .unwrap()
            .push(SurfaceCall::Clear(share_code.to_string()));
    }
}

// ---------------------------------------------------------------------------
// Channel helpers
// ---------------------------------------------------------------------------

/// Next message a session queued for the relay.
pub(crate) async fn next_sent(rx: &mut mpsc::Receiver<TransportCommand>) -> SignalingMessage {
    loop {
        let cmd = tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for outbound message")
            .expect("outbox closed");
        if let TransportCommand::Send(message) = cmd {
            return message;
        }
    }
}

/// Assert nothing further is queued after giving sessions a moment to run.
pub(crate) async fn assert_nothing_sent(rx: &mut mpsc::Receiver<TransportCommand>) {
    tokio::time::sleep(Duration::from_millis(50)).await;
    if let Ok(cmd) = rx.try_recv() {
        panic!("unexpected outbound command: {cmd:?}");
    }
}

pub(crate) async fn next_event(rx: &mut mpsc::Receiver<CallEvent>) -> CallEvent {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for call event")
        .expect("call event channel closed")
}

/// Skip events until a `Closed` arrives.
pub(crate) async fn next_closed(rx: &mut mpsc::Receiver<CallEvent>) -> CallEvent {
    loop {
        let event = next_event(rx).await;
        if matches!(event, CallEvent::Closed { .. }) {
            return event;
        }
    }
}

pub(crate) async fn wait_for_phase(mut rx: watch::Receiver<Phase>, phase: Phase) {
    tokio::time::timeout(WAIT, rx.wait_for(|p| *p == phase))
        .await
        .expect("timed out waiting for phase")
        .expect("session dropped");
}

pub(crate) fn candidate(text: &str) -> IceCandidate {
    IceCandidate {
        sdp_mid: Some("0".into()),
        sdp_m_line_index: Some(0),
        ..IceCandidate::new(text)
    }
}
