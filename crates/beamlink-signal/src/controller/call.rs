use std::sync::Arc;
use std::time::Duration;

use beamlink_common::{RoutingError, ShareCode};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::types::{ClientMode, ControllerConfig, UiIntent};
use crate::peer::PeerConnectionFactory;
use crate::protocol::SignalingMessage;
use crate::registry::SessionRegistry;
use crate::session::{CallEvent, SessionInput};
use crate::transport::{Outbox, TransportEvent};
use crate::ui::CallSurface;

/// Upper bound on waiting for sessions to report closed at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Call Controller
// ---------------------------------------------------------------------------

pub struct CallController {
    mode: ClientMode,
    registry: SessionRegistry,
    call_events: mpsc::Receiver<CallEvent>,
    surface: Arc<dyn CallSurface>,
}

impl CallController {
    pub fn new(
        config: ControllerConfig,
        factory: Arc<dyn PeerConnectionFactory>,
        outbox: Outbox,
        surface: Arc<dyn CallSurface>,
    ) -> Self {
        let (registry, call_events) = SessionRegistry::new(factory, outbox, config.session);
        Self {
            mode: config.mode,
            registry,
            call_events,
            surface,
        }
    }

    pub fn mode(&self) -> ClientMode {
        self.mode
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    // -- Intents ------------------------------------------------------------

    /// Start sharing to `share_code` as the offering side.
    pub async fn start_sharing(&mut self, share_code: ShareCode) -> Result<(), RoutingError> {
        if !self.mode.can_start() {
            return Err(RoutingError::RoleNotPermitted {
                action: "start sharing",
                mode: self.mode.as_str(),
            });
        }
        info!(share_code = %share_code, "Start sharing requested");
        self.registry
            .dispatch(share_code, SessionInput::Start)
            .await
            .map(|_| ())
    }

    pub async fn stop_sharing(&mut self, share_code: &ShareCode) -> Result<(), RoutingError> {
        info!(share_code = %share_code, "Stop sharing requested");
        self.registry.stop(share_code).await
    }

    pub async fn stop_all(&mut self) {
        self.registry.stop_all().await;
    }

    pub async fn handle_intent(&mut self, intent: UiIntent) {
        let result = match intent {
            UiIntent::StartSharing(code) => self.start_sharing(code).await,
            UiIntent::StopSharing(code) => self.stop_sharing(&code).await,
            UiIntent::StopAll => {
                self.stop_all().await;
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!(error = %e, "UI intent rejected");
        }
    }

    // -- Inbound ------------------------------------------------------------

    /// Route one inbound message to its session.
    pub async fn route(&mut self, message: SignalingMessage) -> Result<(), RoutingError> {
        if let SignalingMessage::Login { .. } = message {
            return Err(RoutingError::NotCallMessage(message.channel()));
        }
        let share_code = message.route()?.clone();

        let opens_incoming = matches!(
            message,
            SignalingMessage::WebrtcOffer { .. } | SignalingMessage::WebrtcIceCandidate { .. }
        );
        if opens_incoming && !self.mode.accepts_incoming() && !self.registry.is_live(&share_code)
        {
            return Err(RoutingError::RoleNotPermitted {
                action: "incoming call",
                mode: self.mode.as_str(),
            });
        }

        debug!(share_code = %share_code, channel = message.channel(), "Routing message");
        self.registry
            .dispatch(share_code, SessionInput::Remote(message))
            .await
            .map(|_| ())
    }

    pub async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => info!("Connected to relay"),
            TransportEvent::LoggedIn { name } => info!(name = %name, "Logged in"),
            TransportEvent::Message(message) => {
                let channel = message.channel();
                match self.route(message).await {
                    Ok(()) => {}
                    Err(RoutingError::NotCallMessage(_)) => {
                        debug!(channel, "Ignoring non-call message");
                    }
                    Err(e) => warn!(channel, error = %e, "Dropping relay message"),
                }
            }
            TransportEvent::Disconnected => {
                if !self.registry.is_empty() {
                    warn!(sessions = self.registry.len(), "Relay lost; closing all calls");
                }
                self.registry.close_all().await;
            }
            TransportEvent::Error(e) => warn!(error = %e, "Relay transport error"),
        }
    }

    // -- Session events -----------------------------------------------------

    pub async fn next_call_event(&mut self) -> Option<CallEvent> {
        self.call_events.recv().await
    }

    pub fn handle_call_event(&mut self, event: CallEvent) {
        match event {
            CallEvent::Started { share_code, role } => {
                info!(share_code = %share_code, role = %role, "Call started");
                self.surface.show_call_surface(&share_code);
            }
            CallEvent::RemoteStream { share_code, track } => {
                self.surface.display_remote_stream(&share_code, &track);
            }
            CallEvent::Established { share_code } => {
                info!(share_code = %share_code, "Call established");
            }
            CallEvent::Failed { share_code, error } => {
                warn!(share_code = %share_code, error = %error, "Call failed");
            }
            CallEvent::Closed {
                share_code,
                session_id,
                reason,
            } => {
                info!(share_code = %share_code, ?reason, "Call ended");
                // A replaced session must not tear down its successor's surface.
                if self.registry.remove(&share_code, session_id) {
                    self.surface.clear_local_media(&share_code);
                    self.surface.hide_call_surface(&share_code);
                }
            }
        }
    }

    // -- Run loop -----------------------------------------------------------

    /// Dispatch transport events, session events and UI intents until the
    /// intent channel closes, then stop every call.
    pub async fn run(
        mut self,
        mut transport_events: mpsc::Receiver<TransportEvent>,
        mut intents: mpsc::Receiver<UiIntent>,
    ) {
        info!(mode = %self.mode, "Call controller running");
        loop {
            tokio::select! {
                Some(event) = transport_events.recv() => self.handle_transport_event(event).await,
                Some(event) = self.call_events.recv() => self.handle_call_event(event),
                intent = intents.recv() => match intent {
                    Some(intent) => self.handle_intent(intent).await,
                    None => break,
                },
            }
        }

        self.shutdown().await;
    }

    async fn shutdown(&mut self) {
        info!(sessions = self.registry.len(), "Shutting down call controller");
        self.registry.stop_all().await;
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while !self.registry.is_empty() {
                match self.call_events.recv().await {
                    Some(event) => self.handle_call_event(event),
                    None => break,
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!(
                sessions = self.registry.len(),
                "Calls did not close before shutdown"
            );
        }
    }
}
