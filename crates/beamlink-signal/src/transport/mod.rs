//! WebSocket session with the signaling relay.
//!
//! One background task owns the socket, logs in first on every connect,
//! decodes inbound frames and reconnects with exponential backoff.

mod client;
mod connection;
mod outbox;
mod types;


pub use client::TransportClient;
pub use outbox::Outbox;
pub use types::{TransportCommand, TransportConfig, TransportEvent};
