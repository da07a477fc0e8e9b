//! Signaling over the Wowza WebRTC WebSocket protocol.
//!
//! - `codec`: JSON wire format (offer command, server responses)
//! - `session`: state machine interpreting responses
//! - `listener`: events reported to the host (Rust trait or C callbacks)
//! - `client`: public connect/open/trickle/disconnect operations

pub mod client;
pub mod codec;
pub mod listener;
pub mod session;
pub mod stats;

pub use client::*;
pub use codec::{decode_message, encode_offer, Inbound, OfferRequest, SignalingMessage};
pub use listener::*;
pub use session::*;
pub use stats::*;
