//! Task driving one call session.

use std::sync::Arc;

use beamlink_common::{NegotiationError, ShareCode};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use super::machine::CallSession;
use super::types::{CallEvent, CloseReason, Phase, Role, SessionConfig, SessionInput};
use crate::peer::{PeerConnectionFactory, PeerEvent};
use crate::protocol::SignalingMessage;
use crate::transport::Outbox;

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Registry-side handle to a running session task.
pub struct SessionHandle {
    id: u64,
    role: Role,
    inputs: mpsc::Sender<SessionInput>,
    phase: watch::Receiver<Phase>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Closed sessions, or sessions whose task already ended.
    pub fn is_closed(&self) -> bool {
        self.phase().is_closed() || self.task.is_finished()
    }

    /// A receiver that observes this session's phase changes.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.clone()
    }

    /// Queue an input. Hands the input back if the session task is gone.
    pub async fn send(&self, input: SessionInput) -> Result<(), SessionInput> {
        self.inputs.send(input).await.map_err(|e| e.0)
    }
}

// ---------------------------------------------------------------------------
// Spawn
// ---------------------------------------------------------------------------

pub(crate) fn spawn(
    id: u64,
    share_code: ShareCode,
    role: Role,
    factory: Arc<dyn PeerConnectionFactory>,
    outbox: Outbox,
    events: mpsc::Sender<CallEvent>,
    config: &SessionConfig,
) -> SessionHandle {
    let capacity = config.channel_capacity.max(1);
    let (input_tx, input_rx) = mpsc::channel(capacity);
    let (phase_tx, phase_rx) = watch::channel(Phase::Idle);
    let timeout = config.negotiation_timeout;

    let task = tokio::spawn(async move {
        let (peer_tx, peer_rx) = mpsc::channel(capacity);
        let peer = match factory.create(&share_code, role, peer_tx).await {
            Ok(peer) => peer,
            Err(e) => {
                let err = NegotiationError::Capability {
                    step: "createPeerConnection",
                    message: e.0,
                };
                error!(share_code = %share_code, error = %err, "Could not create peer connection");
                phase_tx.send_replace(Phase::Closed);
                if let Err(e) = outbox.send(SignalingMessage::close(share_code.clone())).await {
                    warn!(share_code = %share_code, error = %e, "Failed to queue close notice");
                }
                let _ = events
                    .send(CallEvent::Failed {
                        share_code: share_code.clone(),
                        error: err.clone(),
                    })
                    .await;
                let _ = events
                    .send(CallEvent::Closed {
                        share_code,
                        session_id: id,
                        reason: CloseReason::Failed(err),
                    })
                    .await;
                return;
            }
        };

        let session = CallSession::new(id, share_code, role, phase_tx, peer, outbox, events);
        run_session(session, input_rx, peer_rx, timeout).await;
    });

    SessionHandle {
        id,
        role,
        inputs: input_tx,
        phase: phase_rx,
        task,
    }
}

/// Feed inputs and peer events to the session one at a time until it closes.
async fn run_session(
    mut session: CallSession,
    mut inputs: mpsc::Receiver<SessionInput>,
    mut peer_events: mpsc::Receiver<PeerEvent>,
    timeout: Option<std::time::Duration>,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        let phase = session.phase();
        if phase.is_closed() {
            break;
        }

        // One deadline spans the opening and negotiating phases of a call.
        match timeout {
            Some(limit) if phase.has_deadline() => {
                deadline.get_or_insert_with(|| Instant::now() + limit);
            }
            _ => deadline = None,
        }
        let expiry = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        // Relay and UI inputs are taken before peer events that raced them.
        tokio::select! {
            biased;
            input = inputs.recv() => match input {
                Some(input) => session.handle(input).await,
                None => {
                    debug!("Session handle dropped; stopping");
                    session.handle(SessionInput::Stop).await;
                }
            },
            Some(event) = peer_events.recv() => session.handle(SessionInput::Peer(event)).await,
            _ = expiry => session.handle(SessionInput::Timeout).await,
        }
    }
}
