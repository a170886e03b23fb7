//! The socket is treated as a black-box JSON event bus: `emit(event,
//! payload)` / `on(event, handler)`. Socket.io framing itself (handshake,
//! packet types) is out of scope for this crate — [`SocketConnector`] is
//! the seam a concrete socket.io (or test) implementation plugs into.

use async_trait::async_trait;
use duplex_error::NetworkError;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Options threaded through to the concrete connector for one attempt.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub url: String,
    pub query: HashMap<String, String>,
    pub path: Option<String>,
    pub token: String,
    pub timeout_ms: u64,
}

/// A single open socket. `emit` is fire-and-forget and preserves call
/// order to the server for this socket (spec §4.1 "Ordering
/// guarantees"); ordering across a reconnect is not preserved.
pub trait Socket: Send + Sync {
    fn emit(&self, event: &str, payload: Value);
    fn close(&self);
}

/// Produces sockets. A real implementation wraps `tokio-tungstenite`
/// with the socket.io packet framing; tests substitute
/// [`crate::test_support::FakeSocketConnector`].
#[async_trait]
pub trait SocketConnector: Send + Sync {
    /// Connect and return the socket plus a channel the transport drains
    /// for inbound raw JSON events (the "single sink" in spec §2).
    async fn connect(
        &self,
        opts: ConnectOptions,
    ) -> Result<(Box<dyn Socket>, mpsc::UnboundedReceiver<Value>), NetworkError>;
}
