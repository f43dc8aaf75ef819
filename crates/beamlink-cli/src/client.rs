//! Wiring of transport, peer factory and call controller for one run.

use std::sync::Arc;
use std::time::Duration;

use beamlink_common::{BeamlinkError, ParticipantIdentity, ShareCode};
use beamlink_config::BeamlinkConfig;
use beamlink_rtc::RtcPeerFactory;
use beamlink_signal::{
    CallController, ClientMode, ControllerConfig, LoggingSurface, SessionConfig, TransportClient,
    TransportConfig, UiIntent,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub(crate) fn transport_config(config: &BeamlinkConfig) -> TransportConfig {
    TransportConfig {
        url: config.relay.url.clone(),
        connect_timeout_secs: u64::from(config.relay.connect_timeout_secs),
        reconnect_delay_secs: u64::from(config.relay.reconnect_delay_secs),
        max_reconnect_delay_secs: u64::from(config.relay.max_reconnect_delay_secs),
        channel_capacity: config.call.event_buffer as usize,
    }
}

pub(crate) fn session_config(config: &BeamlinkConfig) -> SessionConfig {
    let timeout = config.call.negotiation_timeout_secs;
    SessionConfig {
        negotiation_timeout: (timeout > 0).then(|| Duration::from_secs(u64::from(timeout))),
        channel_capacity: config.call.event_buffer as usize,
    }
}

/// Connect, optionally start sharing to `share_to`, and run until Ctrl-C.
pub(crate) async fn run(
    config: &BeamlinkConfig,
    mode: ClientMode,
    identity: ParticipantIdentity,
    share_to: Option<ShareCode>,
) -> Result<(), BeamlinkError> {
    info!(name = %identity, mode = %mode, relay = %config.relay.url, "Starting beamlink");

    let (transport, transport_events) = TransportClient::connect(transport_config(config), identity);

    let factory = RtcPeerFactory::new(config.ice.servers.clone())
        .with_capture(mode != ClientMode::Viewer);
    let controller = CallController::new(
        ControllerConfig {
            mode,
            session: session_config(config),
        },
        Arc::new(factory),
        transport.outbox(),
        Arc::new(LoggingSurface),
    );

    let (intent_tx, intent_rx) = mpsc::channel(16);
    let controller_task = tokio::spawn(controller.run(transport_events, intent_rx));

    if let Some(code) = share_to {
        let _ = intent_tx.send(UiIntent::StartSharing(code)).await;
    }

    tokio::signal::ctrl_c().await?;
    info!("Interrupted; closing calls");

    // Closing the intent channel makes the controller stop every call.
    drop(intent_tx);
    if let Err(e) = controller_task.await {
        warn!(error = %e, "Call controller task failed");
    }
    // Close notices are already queued ahead of the disconnect.
    transport.disconnect().await;
    Ok(())
}
