//! Background WebSocket connection loop with login handshake and reconnect.

use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use beamlink_common::{ParticipantIdentity, TransportError};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use super::types::{TransportCommand, TransportConfig, TransportEvent};
use crate::protocol::{decode, encode, SignalingMessage};

/// How a connected session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpExit {
    /// Socket closed or errored; reconnect.
    Dropped,
    /// `disconnect()` was requested or every handle is gone; stop for good.
    Stop,
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

pub(crate) async fn connection_loop(
    config: TransportConfig,
    identity: ParticipantIdentity,
    connected: Arc<RwLock<bool>>,
    event_tx: mpsc::Sender<TransportEvent>,
    mut command_rx: mpsc::Receiver<TransportCommand>,
) {
    let mut reconnect_delay = config.reconnect_delay_secs.max(1);
    let mut ever_connected = false;
    // Sends queued while the first connection is still being attempted.
    let mut pending: VecDeque<SignalingMessage> = VecDeque::new();

    loop {
        info!(url = %config.url, "Connecting to signaling relay");

        match tokio::time::timeout(
            Duration::from_secs(config.connect_timeout_secs),
            tokio_tungstenite::connect_async(config.url.as_str()),
        )
        .await
        {
            Ok(Ok((ws_stream, _))) => {
                reconnect_delay = config.reconnect_delay_secs.max(1);

                // Messages queued during an outage belong to sessions that
                // were closed by it.
                if ever_connected && discard_queued(&mut command_rx) == PumpExit::Stop {
                    return;
                }
                ever_connected = true;

                let (mut ws_write, mut ws_read) = ws_stream.split();

                let login = SignalingMessage::login(identity.as_str());
                let exit = match send_message(&mut ws_write, &login).await {
                    Ok(()) => {
                        info!(name = %identity, "Logged in to relay");
                        *connected.write().await = true;
                        let _ = event_tx.send(TransportEvent::Connected).await;
                        let _ = event_tx
                            .send(TransportEvent::LoggedIn {
                                name: identity.as_str().to_string(),
                            })
                            .await;
                        match flush_pending(&mut ws_write, &mut pending).await {
                            Ok(()) => {
                                pump(&mut ws_write, &mut ws_read, &mut command_rx, &event_tx)
                                    .await
                            }
                            Err(e) => {
                                warn!(error = %e, "Failed to send queued messages");
                                pending.clear();
                                PumpExit::Dropped
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to send login");
                        PumpExit::Dropped
                    }
                };

                let was_connected = std::mem::replace(&mut *connected.write().await, false);
                if was_connected {
                    let _ = event_tx.send(TransportEvent::Disconnected).await;
                }
                if exit == PumpExit::Stop {
                    info!("Relay connection closed by request");
                    return;
                }
            }
            Ok(Err(e)) => {
                error!(error = %e, "Failed to connect to signaling relay");
                let _ = event_tx
                    .send(TransportEvent::Error(
                        TransportError::Connect(e.to_string()).to_string(),
                    ))
                    .await;
            }
            Err(_elapsed) => {
                error!(
                    timeout_secs = config.connect_timeout_secs,
                    "Relay connection timed out"
                );
                let _ = event_tx
                    .send(TransportEvent::Error(
                        TransportError::Timeout(config.connect_timeout_secs).to_string(),
                    ))
                    .await;
            }
        }

        // Exponential backoff. Sends arriving meanwhile are held until the
        // first login, and dropped after an outage.
        info!(delay = reconnect_delay, "Reconnecting in {} seconds", reconnect_delay);
        let sleep = tokio::time::sleep(Duration::from_secs(reconnect_delay));
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                cmd = command_rx.recv() => match cmd {
                    Some(TransportCommand::Send(msg)) if !ever_connected => {
                        debug!(channel = msg.channel(), "Holding message until first connect");
                        pending.push_back(msg);
                    }
                    Some(TransportCommand::Send(msg)) => {
                        debug!(channel = msg.channel(), "Dropping message while disconnected");
                    }
                    Some(TransportCommand::Disconnect) | None => {
                        info!("Relay connection stopped while reconnecting");
                        return;
                    }
                },
            }
        }
        reconnect_delay = (reconnect_delay * 2).min(config.max_reconnect_delay_secs.max(1));
    }
}

fn discard_queued(command_rx: &mut mpsc::Receiver<TransportCommand>) -> PumpExit {
    let mut dropped = 0usize;
    while let Ok(cmd) = command_rx.try_recv() {
        match cmd {
            TransportCommand::Send(_) => dropped += 1,
            TransportCommand::Disconnect => return PumpExit::Stop,
        }
    }
    if dropped > 0 {
        debug!(dropped, "Discarded messages queued before reconnect");
    }
    PumpExit::Dropped
}

async fn flush_pending<W>(
    ws_write: &mut W,
    pending: &mut VecDeque<SignalingMessage>,
) -> Result<(), String>
where
    W: Sink<WsMessage> + Unpin,
    W::Error: Display,
{
    while let Some(message) = pending.pop_front() {
        send_message(ws_write, &message).await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pump
// ---------------------------------------------------------------------------

/// Shuttle frames between the socket and the channels until either side ends.
async fn pump<W, R>(
    ws_write: &mut W,
    ws_read: &mut R,
    command_rx: &mut mpsc::Receiver<TransportCommand>,
    event_tx: &mpsc::Sender<TransportEvent>,
) -> PumpExit
where
    W: Sink<WsMessage> + Unpin,
    W::Error: Display,
    R: Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        tokio::select! {
            frame = ws_read.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => match decode(text.as_bytes()) {
                    Ok(message) => {
                        debug!(
                            channel = message.channel(),
                            share_code = ?message.share_code().map(|c| c.as_str()),
                            "Received signaling message"
                        );
                        let _ = event_tx.send(TransportEvent::Message(message)).await;
                    }
                    Err(e) => warn!(error = %e, "Dropping undecodable relay message"),
                },
                Some(Ok(WsMessage::Ping(payload))) => {
                    if let Err(e) = ws_write.send(WsMessage::Pong(payload)).await {
                        warn!(error = %e, "Failed to answer ping");
                        return PumpExit::Dropped;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    info!("Relay closed connection");
                    return PumpExit::Dropped;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                    return PumpExit::Dropped;
                }
            },
            cmd = command_rx.recv() => match cmd {
                Some(TransportCommand::Send(message)) => {
                    if let Err(e) = send_message(ws_write, &message).await {
                        warn!(error = %e, channel = message.channel(), "Failed to send message");
                        return PumpExit::Dropped;
                    }
                }
                Some(TransportCommand::Disconnect) | None => {
                    let _ = ws_write.send(WsMessage::Close(None)).await;
                    return PumpExit::Stop;
                }
            },
        }
    }
}

async fn send_message<W>(ws_write: &mut W, message: &SignalingMessage) -> Result<(), String>
where
    W: Sink<WsMessage> + Unpin,
    W::Error: Display,
{
    let json = match encode(message) {
        Ok(json) => json,
        Err(e) => {
            // Nothing the socket can do about it; keep the connection.
            error!(error = %e, "Failed to encode signaling message");
            return Ok(());
        }
    };
    debug!(channel = message.channel(), "Sending signaling message");
    ws_write
        .send(WsMessage::Text(json.into()))
        .await
        .map_err(|e| e.to_string())
}
