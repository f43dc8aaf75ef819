//! The per-session signaling state machine.

use std::collections::VecDeque;
use std::sync::Arc;

use beamlink_common::{NegotiationError, ShareCode};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::types::{CallEvent, CloseReason, Phase, Role, SessionInput};
use crate::peer::{PeerConnection, PeerError, PeerEvent};
use crate::protocol::{channels, IceCandidate, SessionDescription, SignalingMessage};
use crate::transport::Outbox;

fn capability(step: &'static str) -> impl FnOnce(PeerError) -> NegotiationError {
    move |e| NegotiationError::Capability {
        step,
        message: e.0,
    }
}

// ---------------------------------------------------------------------------
// Call Session
// ---------------------------------------------------------------------------

/// Local half of one call's negotiation.
pub(crate) struct CallSession {
    id: u64,
    share_code: ShareCode,
    role: Role,
    phase: watch::Sender<Phase>,
    remote_description_set: bool,
    /// Remote candidates that arrived before the remote description.
    buffered: VecDeque<IceCandidate>,
    peer: Arc<dyn PeerConnection>,
    outbox: Outbox,
    events: mpsc::Sender<CallEvent>,
}

impl CallSession {
    pub(crate) fn new(
        id: u64,
        share_code: ShareCode,
        role: Role,
        phase: watch::Sender<Phase>,
        peer: Arc<dyn PeerConnection>,
        outbox: Outbox,
        events: mpsc::Sender<CallEvent>,
    ) -> Self {
        Self {
            id,
            share_code,
            role,
            phase,
            remote_description_set: false,
            buffered: VecDeque::new(),
            peer,
            outbox,
            events,
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    fn set_phase(&self, next: Phase) {
        let prev = self.phase.send_replace(next);
        if prev != next {
            debug!(
                share_code = %self.share_code,
                role = %self.role,
                from = %prev,
                to = %next,
                "Session phase changed"
            );
        }
    }

    /// Process one input to completion.
    pub(crate) async fn handle(&mut self, input: SessionInput) {
        if self.phase().is_closed() {
            debug!(share_code = %self.share_code, ?input, "Ignoring input for closed session");
            return;
        }

        let result = match input {
            SessionInput::Start => self.start().await,
            SessionInput::Remote(message) => self.on_remote(message).await,
            SessionInput::Peer(event) => self.on_peer_event(event).await,
            SessionInput::Stop => {
                self.close(CloseReason::LocalStop).await;
                Ok(())
            }
            SessionInput::TransportLost => {
                self.close(CloseReason::TransportLost).await;
                Ok(())
            }
            SessionInput::Timeout => self.on_timeout().await,
            SessionInput::Abandon => {
                self.close(CloseReason::Abandoned).await;
                Ok(())
            }
        };

        if let Err(err) = result {
            self.fail(err).await;
        }
    }

    // -- Offerer ------------------------------------------------------------

    async fn start(&mut self) -> Result<(), NegotiationError> {
        if self.role != Role::Offerer || self.phase() != Phase::Idle {
            warn!(
                share_code = %self.share_code,
                role = %self.role,
                phase = %self.phase(),
                "Ignoring start for a session that is not an idle offerer"
            );
            return Ok(());
        }

        info!(share_code = %self.share_code, "Starting call as offerer");
        self.set_phase(Phase::AwaitingLocalDescription);
        self.emit(CallEvent::Started {
            share_code: self.share_code.clone(),
            role: self.role,
        })
        .await;

        let offer = self
            .peer
            .create_offer()
            .await
            .map_err(capability("createOffer"))?;
        self.peer
            .set_local_description(offer.clone())
            .await
            .map_err(capability("setLocalDescription"))?;
        self.send(SignalingMessage::offer(offer, self.share_code.clone()))
            .await;
        self.set_phase(Phase::AwaitingRemoteDescription);
        Ok(())
    }

    async fn on_answer(&mut self, answer: SessionDescription) -> Result<(), NegotiationError> {
        match self.phase() {
            Phase::AwaitingRemoteDescription if self.role == Role::Offerer => {}
            Phase::Established => {
                warn!(share_code = %self.share_code, "Ignoring duplicate answer");
                return Ok(());
            }
            phase => return Err(self.out_of_order(channels::WEBRTC_ANSWER, phase)),
        }

        self.peer
            .set_remote_description(answer)
            .await
            .map_err(capability("setRemoteDescription"))?;
        self.remote_description_set = true;
        self.drain_candidates().await?;
        self.establish().await;
        Ok(())
    }

    // -- Answerer -----------------------------------------------------------

    async fn on_offer(&mut self, offer: SessionDescription) -> Result<(), NegotiationError> {
        let phase = self.phase();
        if phase != Phase::Idle || self.role != Role::Answerer {
            return Err(self.out_of_order(channels::WEBRTC_OFFER, phase));
        }

        info!(share_code = %self.share_code, "Answering incoming call");
        self.set_phase(Phase::AwaitingLocalDescription);
        self.emit(CallEvent::Started {
            share_code: self.share_code.clone(),
            role: self.role,
        })
        .await;

        self.peer
            .set_remote_description(offer)
            .await
            .map_err(capability("setRemoteDescription"))?;
        self.remote_description_set = true;
        self.drain_candidates().await?;

        let answer = self
            .peer
            .create_answer()
            .await
            .map_err(capability("createAnswer"))?;
        self.peer
            .set_local_description(answer.clone())
            .await
            .map_err(capability("setLocalDescription"))?;
        self.send(SignalingMessage::answer(answer, self.share_code.clone()))
            .await;
        self.set_phase(Phase::Negotiating);
        Ok(())
    }

    // -- Shared -------------------------------------------------------------

    async fn on_remote(&mut self, message: SignalingMessage) -> Result<(), NegotiationError> {
        match message {
            SignalingMessage::StartCall { .. } => self.start().await,
            SignalingMessage::WebrtcOffer { offer, .. } => self.on_offer(offer).await,
            SignalingMessage::WebrtcAnswer { answer, .. } => self.on_answer(answer).await,
            SignalingMessage::WebrtcIceCandidate { candidate, .. } => {
                self.on_remote_candidate(candidate).await
            }
            SignalingMessage::WebrtcClose { .. } => {
                info!(share_code = %self.share_code, "Peer closed the call");
                self.close(CloseReason::RemoteClosed).await;
                Ok(())
            }
            SignalingMessage::Login { .. } => Ok(()),
        }
    }

    async fn on_remote_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> Result<(), NegotiationError> {
        if !self.remote_description_set {
            self.buffered.push_back(candidate);
            debug!(
                share_code = %self.share_code,
                buffered = self.buffered.len(),
                "Buffered remote candidate"
            );
            return Ok(());
        }
        self.peer
            .add_ice_candidate(candidate)
            .await
            .map_err(capability("addIceCandidate"))
    }

    async fn drain_candidates(&mut self) -> Result<(), NegotiationError> {
        if !self.buffered.is_empty() {
            debug!(
                share_code = %self.share_code,
                count = self.buffered.len(),
                "Applying buffered candidates"
            );
        }
        while let Some(candidate) = self.buffered.pop_front() {
            self.peer
                .add_ice_candidate(candidate)
                .await
                .map_err(capability("addIceCandidate"))?;
        }
        Ok(())
    }

    async fn on_peer_event(&mut self, event: PeerEvent) -> Result<(), NegotiationError> {
        match event {
            PeerEvent::LocalCandidate(candidate) => {
                self.send(SignalingMessage::ice_candidate(
                    candidate,
                    self.share_code.clone(),
                ))
                .await;
            }
            PeerEvent::RemoteTrack(track) => {
                info!(
                    share_code = %self.share_code,
                    track_id = %track.track_id,
                    "Remote track arrived"
                );
                self.emit(CallEvent::RemoteStream {
                    share_code: self.share_code.clone(),
                    track,
                })
                .await;
                if self.phase() == Phase::Negotiating {
                    self.establish().await;
                }
            }
            PeerEvent::Connected => {
                if self.phase() == Phase::Negotiating {
                    self.establish().await;
                }
            }
            PeerEvent::TrackEnded => {
                info!(share_code = %self.share_code, "Local track ended");
                self.close(CloseReason::TrackEnded).await;
            }
            PeerEvent::Failed => {
                return Err(NegotiationError::PeerConnectionFailed(
                    self.share_code.clone(),
                ));
            }
        }
        Ok(())
    }

    async fn on_timeout(&mut self) -> Result<(), NegotiationError> {
        let phase = self.phase();
        if phase == Phase::Idle {
            info!(share_code = %self.share_code, role = %self.role, "No call opened; discarding session");
            self.close(CloseReason::Abandoned).await;
            return Ok(());
        }
        if !phase.is_negotiating() {
            return Ok(());
        }
        Err(NegotiationError::Timeout {
            share_code: self.share_code.clone(),
            phase: phase.to_string(),
        })
    }

    async fn establish(&mut self) {
        info!(share_code = %self.share_code, role = %self.role, "Call established");
        self.set_phase(Phase::Established);
        self.emit(CallEvent::Established {
            share_code: self.share_code.clone(),
        })
        .await;
    }

    fn out_of_order(&self, channel: &'static str, phase: Phase) -> NegotiationError {
        NegotiationError::OutOfOrder {
            share_code: self.share_code.clone(),
            channel,
            phase: phase.to_string(),
        }
    }

    // -- Teardown -----------------------------------------------------------

    async fn fail(&mut self, err: NegotiationError) {
        error!(share_code = %self.share_code, error = %err, "Negotiation failed");
        self.emit(CallEvent::Failed {
            share_code: self.share_code.clone(),
            error: err.clone(),
        })
        .await;
        self.close(CloseReason::Failed(err)).await;
    }

    async fn close(&mut self, reason: CloseReason) {
        if self.phase().is_closed() {
            return;
        }
        if let Err(e) = self.peer.close().await {
            warn!(share_code = %self.share_code, error = %e, "Failed to close peer connection");
        }
        self.buffered.clear();
        self.set_phase(Phase::Closed);

        if reason.notifies_peer() {
            self.send(SignalingMessage::close(self.share_code.clone()))
                .await;
        }
        info!(share_code = %self.share_code, ?reason, "Call closed");
        self.emit(CallEvent::Closed {
            share_code: self.share_code.clone(),
            session_id: self.id,
            reason,
        })
        .await;
    }

    async fn send(&self, message: SignalingMessage) {
        let channel = message.channel();
        if let Err(e) = self.outbox.send(message).await {
            warn!(share_code = %self.share_code, channel, error = %e, "Failed to queue message");
        }
    }

    async fn emit(&self, event: CallEvent) {
        let _ = self.events.send(event).await;
    }
}
