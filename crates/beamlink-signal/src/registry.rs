//! Share code to call session bookkeeping for one client.

use std::collections::HashMap;
use std::sync::Arc;

use beamlink_common::{RoutingError, ShareCode};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::peer::PeerConnectionFactory;
use crate::session::{self, CallEvent, Phase, Role, SessionConfig, SessionHandle, SessionInput};
use crate::transport::Outbox;

// ---------------------------------------------------------------------------
// Session Registry
// ---------------------------------------------------------------------------

/// Holds at most one live session per share code.
pub struct SessionRegistry {
    sessions: HashMap<ShareCode, SessionHandle>,
    factory: Arc<dyn PeerConnectionFactory>,
    outbox: Outbox,
    config: SessionConfig,
    event_tx: mpsc::Sender<CallEvent>,
    next_id: u64,
}

impl SessionRegistry {
    /// Create a registry. Returns `(registry, call_event_receiver)`.
    pub fn new(
        factory: Arc<dyn PeerConnectionFactory>,
        outbox: Outbox,
        config: SessionConfig,
    ) -> (Self, mpsc::Receiver<CallEvent>) {
        let (event_tx, event_rx) = mpsc::channel(config.channel_capacity.max(1));
        let registry = Self {
            sessions: HashMap::new(),
            factory,
            outbox,
            config,
            event_tx,
            next_id: 1,
        };
        (registry, event_rx)
    }

    /// Deliver `input` to the live session for `share_code`, creating one if
    /// none exists and the input may open a call.
    ///
    /// Returns the id of the session that received the input.
    pub async fn dispatch(
        &mut self,
        share_code: ShareCode,
        input: SessionInput,
    ) -> Result<u64, RoutingError> {
        let input = match self.sessions.get(&share_code) {
            Some(handle) if !handle.is_closed() => {
                if input.is_start() && handle.phase() != Phase::Idle {
                    warn!(
                        share_code = %share_code,
                        phase = %handle.phase(),
                        "Rejecting start for a session already in progress"
                    );
                    return Err(RoutingError::SessionBusy(share_code));
                }
                if Role::for_first_input(&input) == Role::Offerer && handle.role() != Role::Offerer
                {
                    // An idle answerer left behind by a stray candidate.
                    info!(
                        share_code = %share_code,
                        session_id = handle.id(),
                        "Replacing idle answerer with a new call"
                    );
                    let _ = handle.send(SessionInput::Abandon).await;
                    input
                } else {
                    let id = handle.id();
                    match handle.send(input).await {
                        Ok(()) => return Ok(id),
                        // Closed between the check and the send.
                        Err(input) => input,
                    }
                }
            }
            _ => input,
        };

        if self.sessions.remove(&share_code).is_some() {
            debug!(share_code = %share_code, "Replacing previous session");
        }

        let role = Role::for_first_input(&input);
        if role == Role::Unset {
            return Err(RoutingError::UnknownSession(share_code));
        }

        let id = self.next_id;
        self.next_id += 1;
        info!(share_code = %share_code, session_id = id, role = %role, "Creating call session");

        let handle = session::spawn(
            id,
            share_code.clone(),
            role,
            Arc::clone(&self.factory),
            self.outbox.clone(),
            self.event_tx.clone(),
            &self.config,
        );
        if handle.send(input).await.is_err() {
            warn!(share_code = %share_code, "Session ended before its first input");
        }
        self.sessions.insert(share_code, handle);
        Ok(id)
    }

    /// Ask the session for `share_code` to stop.
    pub async fn stop(&self, share_code: &ShareCode) -> Result<(), RoutingError> {
        match self.sessions.get(share_code) {
            Some(handle) if !handle.is_closed() => {
                let _ = handle.send(SessionInput::Stop).await;
                Ok(())
            }
            _ => Err(RoutingError::UnknownSession(share_code.clone())),
        }
    }

    pub async fn stop_all(&self) {
        self.broadcast(SessionInput::Stop).await;
    }

    /// Close every session without notifying peers.
    pub async fn close_all(&self) {
        self.broadcast(SessionInput::TransportLost).await;
    }

    async fn broadcast(&self, input: SessionInput) {
        for handle in self.sessions.values() {
            if !handle.is_closed() {
                let _ = handle.send(input.clone()).await;
            }
        }
    }

    /// Drop the entry for `share_code` if it still belongs to `session_id`.
    pub fn remove(&mut self, share_code: &ShareCode, session_id: u64) -> bool {
        match self.sessions.get(share_code) {
            Some(handle) if handle.id() == session_id => {
                self.sessions.remove(share_code);
                debug!(share_code = %share_code, session_id, "Removed session");
                true
            }
            _ => false,
        }
    }

    pub fn phase(&self, share_code: &ShareCode) -> Option<Phase> {
        self.sessions.get(share_code).map(|h| h.phase())
    }

    /// Observe phase changes of the current session for `share_code`.
    pub fn subscribe(&self, share_code: &ShareCode) -> Option<watch::Receiver<Phase>> {
        self.sessions.get(share_code).map(|h| h.subscribe())
    }

    pub fn session_id(&self, share_code: &ShareCode) -> Option<u64> {
        self.sessions.get(share_code).map(|h| h.id())
    }

    pub fn is_live(&self, share_code: &ShareCode) -> bool {
        self.sessions
            .get(share_code)
            .is_some_and(|h| !h.is_closed())
    }

    pub fn share_codes(&self) -> Vec<ShareCode> {
        self.sessions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
