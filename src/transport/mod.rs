//! WebSocket transport for the signaling channel.
//!
//! A thin facade over a single TLS-capable WebSocket connection. The
//! connection runs on its own worker thread and reports lifecycle changes
//! through [`TransportEvents`]; everything else talks to it through the
//! synchronized [`WsConnection`] API.

pub mod tls;
pub mod websocket;

pub use websocket::*;

/// Lifecycle notifications raised from the transport worker thread.
///
/// All methods are called on the worker thread, never on the caller of
/// [`WsConnection::connect`].
pub trait TransportEvents: Send + Sync {
    /// WebSocket handshake completed
    fn on_transport_opened(&self);
    /// A text frame arrived
    fn on_transport_message(&self, payload: &str);
    /// The connection was closed (by either side)
    fn on_transport_closed(&self);
    /// The connection could not be established or broke
    fn on_transport_failed(&self, reason: &str);
}

/// Link state of the underlying WebSocket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Connect requested, handshake not finished
    Connecting,
    /// Handshake done, frames may be sent
    Open,
    /// Close frame queued
    Closing,
    /// Run loop finished or never connected
    Closed,
}
