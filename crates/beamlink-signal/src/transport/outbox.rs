use beamlink_common::TransportError;
use tokio::sync::mpsc;

use super::types::TransportCommand;
use crate::protocol::SignalingMessage;

/// Clonable handle for queuing outbound signaling messages.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::Sender<TransportCommand>,
}

impl Outbox {
    /// Create an outbox together with the receiving end of its queue.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TransportCommand>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub(crate) fn from_sender(tx: mpsc::Sender<TransportCommand>) -> Self {
        Self { tx }
    }

    /// Queue a message. Fails once the connection task has stopped.
    pub async fn send(&self, message: SignalingMessage) -> Result<(), TransportError> {
        self.tx
            .send(TransportCommand::Send(message))
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }

    pub async fn disconnect(&self) -> Result<(), TransportError> {
        self.tx
            .send(TransportCommand::Disconnect)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beamlink_common::ShareCode;

    #[tokio::test]
    async fn queues_messages_in_order() {
        let (outbox, mut rx) = Outbox::channel(8);
        outbox
            .send(SignalingMessage::start_call(ShareCode::from("a")))
            .await
            .unwrap();
        outbox
            .send(SignalingMessage::close(ShareCode::from("a")))
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await,
            Some(TransportCommand::Send(SignalingMessage::start_call(
                ShareCode::from("a")
            )))
        );
        assert_eq!(
            rx.recv().await,
            Some(TransportCommand::Send(SignalingMessage::close(
                ShareCode::from("a")
            )))
        );
    }

    #[tokio::test]
    async fn send_after_receiver_dropped_fails() {
        let (outbox, rx) = Outbox::channel(8);
        drop(rx);
        let err = outbox
            .send(SignalingMessage::close(ShareCode::from("a")))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::ChannelClosed);
    }
}
