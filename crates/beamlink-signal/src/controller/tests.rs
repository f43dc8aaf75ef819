use std::sync::Arc;

use beamlink_common::{RoutingError, ShareCode};
use tokio::sync::mpsc;

use super::*;
use crate::peer::{PeerEvent, RemoteTrack};
use crate::protocol::{decode, SdpType, SessionDescription, SignalingMessage};
use crate::session::{CallEvent, CloseReason, Phase, Role};
use crate::testing::{
    assert_nothing_sent, candidate, next_sent, wait_for_phase, MockPeerFactory, PeerCall,
    RecordingSurface, SurfaceCall, WAIT,
};
use crate::transport::{Outbox, TransportCommand, TransportEvent};

struct Client {
    controller: CallController,
    sent: mpsc::Receiver<TransportCommand>,
    factory: Arc<MockPeerFactory>,
    surface: Arc<RecordingSurface>,
}

fn client(mode: ClientMode) -> Client {
    let factory = MockPeerFactory::new();
    let surface = Arc::new(RecordingSurface::default());
    let (outbox, sent) = Outbox::channel(64);
    let controller = CallController::new(
        ControllerConfig {
            mode,
            ..ControllerConfig::default()
        },
        factory.clone(),
        outbox,
        surface.clone(),
    );
    Client {
        controller,
        sent,
        factory,
        surface,
    }
}

fn xyz() -> ShareCode {
    ShareCode::from("XYZ")
}

fn offer_for(code: &str) -> SignalingMessage {
    SignalingMessage::offer(SessionDescription::offer("v=0"), ShareCode::from(code))
}

impl Client {
    /// Feed session events to the controller until one matches.
    async fn pump_until(&mut self, pred: impl Fn(&CallEvent) -> bool) -> CallEvent {
        loop {
            let event = tokio::time::timeout(WAIT, self.controller.next_call_event())
                .await
                .expect("timed out waiting for call event")
                .expect("call events closed");
            let done = pred(&event);
            self.controller.handle_call_event(event.clone());
            if done {
                return event;
            }
        }
    }

    async fn pump_until_closed(&mut self) -> CallEvent {
        self.pump_until(|e| matches!(e, CallEvent::Closed { .. })).await
    }

    async fn wait_phase(&self, code: &ShareCode, phase: Phase) {
        let rx = self
            .controller
            .registry()
            .subscribe(code)
            .expect("no session for share code");
        wait_for_phase(rx, phase).await;
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unsolicited_offer_creates_answerer() {
    let mut b = client(ClientMode::Both);

    b.controller.route(offer_for("XYZ")).await.unwrap();

    match next_sent(&mut b.sent).await {
        SignalingMessage::WebrtcAnswer { share_code, .. } => assert_eq!(share_code, Some(xyz())),
        other => panic!("expected answer, got {other:?}"),
    }
    assert_eq!(b.factory.role("XYZ"), Role::Answerer);

    b.pump_until(|e| matches!(e, CallEvent::Started { .. }))
        .await;
    assert_eq!(b.surface.calls(), vec![SurfaceCall::Show("XYZ".into())]);
}

#[tokio::test]
async fn close_then_start_call_builds_a_new_session() {
    let mut b = client(ClientMode::Both);

    b.controller.route(offer_for("XYZ")).await.unwrap();
    next_sent(&mut b.sent).await;
    b.wait_phase(&xyz(), Phase::Negotiating).await;
    b.factory.raise("XYZ", PeerEvent::Connected).await;
    b.wait_phase(&xyz(), Phase::Established).await;
    let first_id = b.controller.registry().session_id(&xyz()).unwrap();

    b.controller
        .route(SignalingMessage::close(xyz()))
        .await
        .unwrap();
    let closed = b.pump_until_closed().await;
    assert!(matches!(
        closed,
        CallEvent::Closed {
            reason: CloseReason::RemoteClosed,
            ..
        }
    ));

    let calls = b.surface.calls();
    assert!(calls.contains(&SurfaceCall::Clear("XYZ".into())));
    assert_eq!(calls.last(), Some(&SurfaceCall::Hide("XYZ".into())));
    assert!(b.controller.registry().is_empty());
    assert_eq!(b.factory.peer("XYZ").count(&PeerCall::Close), 1);

    b.controller
        .route(SignalingMessage::start_call(xyz()))
        .await
        .unwrap();
    assert!(matches!(
        next_sent(&mut b.sent).await,
        SignalingMessage::WebrtcOffer { .. }
    ));
    let second_id = b.controller.registry().session_id(&xyz()).unwrap();
    assert_ne!(first_id, second_id);
    assert_eq!(b.factory.role("XYZ"), Role::Offerer);
    assert_eq!(b.factory.peer("XYZ").count(&PeerCall::CreateOffer), 1);
}

/// Answer a call on XYZ, let the caller hang up, then deliver a trickle
/// candidate from that call. Returns the id of the stray session it creates.
async fn hang_up_then_late_candidate(b: &mut Client) -> u64 {
    b.controller.route(offer_for("XYZ")).await.unwrap();
    next_sent(&mut b.sent).await;
    b.controller
        .route(SignalingMessage::close(xyz()))
        .await
        .unwrap();
    b.pump_until_closed().await;

    b.controller
        .route(SignalingMessage::ice_candidate(candidate("candidate:late"), xyz()))
        .await
        .unwrap();
    b.controller.registry().session_id(&xyz()).unwrap()
}

async fn assert_stray_closed_quietly(b: &mut Client, stray_id: u64) {
    let closed = b
        .pump_until(|e| {
            matches!(e, CallEvent::Closed { session_id, .. } if *session_id == stray_id)
        })
        .await;
    assert!(matches!(
        closed,
        CallEvent::Closed {
            reason: CloseReason::Abandoned,
            ..
        }
    ));
    // Only the first call's teardown hid the surface.
    let hides = b
        .surface
        .calls()
        .iter()
        .filter(|c| **c == SurfaceCall::Hide("XYZ".into()))
        .count();
    assert_eq!(hides, 1);
    assert!(b.controller.registry().is_live(&xyz()));
}

#[tokio::test]
async fn late_candidate_does_not_block_next_start_call() {
    let mut b = client(ClientMode::Both);
    let stray_id = hang_up_then_late_candidate(&mut b).await;

    b.controller
        .route(SignalingMessage::start_call(xyz()))
        .await
        .unwrap();
    assert!(matches!(
        next_sent(&mut b.sent).await,
        SignalingMessage::WebrtcOffer { .. }
    ));
    assert_eq!(b.factory.role("XYZ"), Role::Offerer);
    assert_ne!(b.controller.registry().session_id(&xyz()), Some(stray_id));

    assert_stray_closed_quietly(&mut b, stray_id).await;
    assert_nothing_sent(&mut b.sent).await;
}

#[tokio::test]
async fn late_candidate_does_not_block_local_start() {
    let mut b = client(ClientMode::Both);
    let stray_id = hang_up_then_late_candidate(&mut b).await;

    b.controller.start_sharing(xyz()).await.unwrap();
    assert!(matches!(
        next_sent(&mut b.sent).await,
        SignalingMessage::WebrtcOffer { .. }
    ));
    assert_eq!(b.factory.created_count(), 3);

    assert_stray_closed_quietly(&mut b, stray_id).await;
}

#[tokio::test]
async fn offer_without_share_code_is_rejected() {
    let mut b = client(ClientMode::Both);
    b.controller.route(offer_for("ABC")).await.unwrap();
    next_sent(&mut b.sent).await;

    let message =
        decode(br#"{"channel":"webrtc_offer","offer":{"type":"offer","sdp":"v=0"}}"#).unwrap();
    let err = b.controller.route(message).await.unwrap_err();

    assert_eq!(
        err,
        RoutingError::MissingShareCode {
            channel: "webrtc_offer"
        }
    );
    assert_eq!(b.controller.registry().len(), 1);
    assert_eq!(b.factory.created_count(), 1);
    assert_nothing_sent(&mut b.sent).await;
}

#[tokio::test]
async fn inbound_login_is_not_routed() {
    let mut b = client(ClientMode::Both);
    let err = b
        .controller
        .route(SignalingMessage::login("alice"))
        .await
        .unwrap_err();
    assert_eq!(err, RoutingError::NotCallMessage("login"));
    assert!(b.controller.registry().is_empty());
}

#[tokio::test]
async fn two_clients_negotiate_once() {
    let mut a = client(ClientMode::Both);
    let mut b = client(ClientMode::Both);

    a.controller.start_sharing(xyz()).await.unwrap();
    let offer = next_sent(&mut a.sent).await;
    b.controller.route(offer).await.unwrap();
    let answer = next_sent(&mut b.sent).await;
    a.controller.route(answer).await.unwrap();
    a.wait_phase(&xyz(), Phase::Established).await;

    // Trickle one candidate each way.
    a.factory
        .raise("XYZ", PeerEvent::LocalCandidate(candidate("candidate:a1")))
        .await;
    b.controller
        .route(next_sent(&mut a.sent).await)
        .await
        .unwrap();
    b.factory
        .raise("XYZ", PeerEvent::LocalCandidate(candidate("candidate:b1")))
        .await;
    a.controller
        .route(next_sent(&mut b.sent).await)
        .await
        .unwrap();

    b.factory
        .raise(
            "XYZ",
            PeerEvent::RemoteTrack(RemoteTrack {
                stream_id: "screen".into(),
                track_id: "video0".into(),
            }),
        )
        .await;
    b.pump_until(|e| matches!(e, CallEvent::Established { .. }))
        .await;

    let a_peer = a.factory.peer("XYZ");
    let b_peer = b.factory.peer("XYZ");
    assert_eq!(a_peer.count(&PeerCall::CreateOffer), 1);
    assert_eq!(a_peer.count(&PeerCall::CreateAnswer), 0);
    assert_eq!(b_peer.count(&PeerCall::CreateAnswer), 1);
    assert_eq!(b_peer.count(&PeerCall::CreateOffer), 0);
    assert_eq!(
        &a_peer.calls()[..3],
        &[
            PeerCall::CreateOffer,
            PeerCall::SetLocal(SdpType::Offer),
            PeerCall::SetRemote(SdpType::Answer),
        ]
    );
    assert_eq!(b_peer.count(&PeerCall::AddCandidate("candidate:a1".into())), 1);

    assert!(b
        .surface
        .calls()
        .contains(&SurfaceCall::Display("XYZ".into(), "video0".into())));

    // Sharer stops: the viewer collapses its call surface.
    a.controller.stop_sharing(&xyz()).await.unwrap();
    let close = next_sent(&mut a.sent).await;
    assert_eq!(close, SignalingMessage::close(xyz()));
    b.controller.route(close).await.unwrap();
    b.pump_until_closed().await;
    assert_eq!(b.surface.calls().last(), Some(&SurfaceCall::Hide("XYZ".into())));
    assert_nothing_sent(&mut b.sent).await;
}

#[tokio::test]
async fn busy_share_code_rejects_second_start() {
    let mut a = client(ClientMode::Both);

    a.controller.start_sharing(xyz()).await.unwrap();
    next_sent(&mut a.sent).await;
    a.wait_phase(&xyz(), Phase::AwaitingRemoteDescription).await;

    let err = a.controller.start_sharing(xyz()).await.unwrap_err();
    assert_eq!(err, RoutingError::SessionBusy(xyz()));
    assert_eq!(a.factory.created_count(), 1);
}

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn viewer_cannot_start_sharing() {
    let mut v = client(ClientMode::Viewer);
    let err = v.controller.start_sharing(xyz()).await.unwrap_err();
    assert_eq!(
        err,
        RoutingError::RoleNotPermitted {
            action: "start sharing",
            mode: "viewer"
        }
    );
    assert_eq!(v.factory.created_count(), 0);
}

#[tokio::test]
async fn sharer_refuses_incoming_calls() {
    let mut s = client(ClientMode::Sharer);
    let err = s.controller.route(offer_for("XYZ")).await.unwrap_err();
    assert_eq!(
        err,
        RoutingError::RoleNotPermitted {
            action: "incoming call",
            mode: "sharer"
        }
    );
    assert!(s.controller.registry().is_empty());
    assert_nothing_sent(&mut s.sent).await;
}

#[tokio::test]
async fn sharer_accepts_candidates_for_its_own_call() {
    let mut s = client(ClientMode::Sharer);
    s.controller.start_sharing(xyz()).await.unwrap();
    next_sent(&mut s.sent).await;

    s.controller
        .route(SignalingMessage::ice_candidate(candidate("candidate:1"), xyz()))
        .await
        .unwrap();
    assert_eq!(s.factory.created_count(), 1);
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transport_loss_closes_calls_without_notice() {
    let mut a = client(ClientMode::Both);
    a.controller.start_sharing(xyz()).await.unwrap();
    next_sent(&mut a.sent).await;

    a.controller
        .handle_transport_event(TransportEvent::Disconnected)
        .await;
    let closed = a.pump_until_closed().await;

    assert!(matches!(
        closed,
        CallEvent::Closed {
            reason: CloseReason::TransportLost,
            ..
        }
    ));
    assert!(a.controller.registry().is_empty());
    assert_eq!(a.surface.calls().last(), Some(&SurfaceCall::Hide("XYZ".into())));
    assert_nothing_sent(&mut a.sent).await;
}

#[tokio::test]
async fn run_stops_calls_when_intents_close() {
    let Client {
        controller,
        mut sent,
        surface,
        ..
    } = client(ClientMode::Both);
    let (_transport_tx, transport_rx) = mpsc::channel(8);
    let (intent_tx, intent_rx) = mpsc::channel(8);

    let run = tokio::spawn(controller.run(transport_rx, intent_rx));
    intent_tx
        .send(UiIntent::StartSharing(xyz()))
        .await
        .unwrap();
    assert!(matches!(
        next_sent(&mut sent).await,
        SignalingMessage::WebrtcOffer { .. }
    ));

    drop(intent_tx);
    tokio::time::timeout(WAIT, run).await.unwrap().unwrap();

    assert_eq!(next_sent(&mut sent).await, SignalingMessage::close(xyz()));
    assert_eq!(surface.calls().last(), Some(&SurfaceCall::Hide("XYZ".into())));
}

#[tokio::test]
async fn run_routes_relay_messages() {
    let Client {
        controller,
        mut sent,
        factory,
        ..
    } = client(ClientMode::Viewer);
    let (transport_tx, transport_rx) = mpsc::channel(8);
    let (_intent_tx, intent_rx) = mpsc::channel::<UiIntent>(8);

    tokio::spawn(controller.run(transport_rx, intent_rx));
    transport_tx.send(TransportEvent::Connected).await.unwrap();
    transport_tx
        .send(TransportEvent::Message(SignalingMessage::login("relay")))
        .await
        .unwrap();
    transport_tx
        .send(TransportEvent::Message(offer_for("XYZ")))
        .await
        .unwrap();

    assert!(matches!(
        next_sent(&mut sent).await,
        SignalingMessage::WebrtcAnswer { .. }
    ));
    assert_eq!(factory.role("XYZ"), Role::Answerer);
}
