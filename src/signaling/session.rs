//! Signaling session state machine.
//!
//! ```text
//! Idle --connect--> Connecting --opened--> Connected --offer--> Negotiating --answer--> Open
//!                        |                     |                     |                  |
//!                        +---- failed ---------+---------------------+------------------+--> Failed
//!                        +---- closed / local close / status >= 500 ---------------------+--> Closed
//! ```
//!
//! [`Session`] receives the transport callbacks on the worker thread,
//! interprets server responses and forwards them to the listener.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use log::{debug, info, warn};
use parking_lot::Mutex;

use super::codec::{self, Inbound, SignalingMessage, COMMAND_SEND_OFFER};
use super::listener::SignalingListener;
use super::stats::SignalingStats;
use crate::error::{Result, SignalingError};
use crate::sanitize::sanitize;
use crate::transport::TransportEvents;

// Session state codes (C API)
pub const SESSION_STATE_IDLE: u32 = 0;
pub const SESSION_STATE_CONNECTING: u32 = 1;
pub const SESSION_STATE_CONNECTED: u32 = 2;
pub const SESSION_STATE_NEGOTIATING: u32 = 3;
pub const SESSION_STATE_OPEN: u32 = 4;
pub const SESSION_STATE_CLOSED: u32 = 5;
pub const SESSION_STATE_FAILED: u32 = 6;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Negotiating,
    Open,
    Closed,
    Failed,
}

/// Inputs that move the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// `connect` issued the transport connect request
    Connect,
    TransportOpened,
    /// Offer is about to be sent
    OfferSent,
    /// Offer could not be queued
    OfferFailed,
    /// `sendOffer` response with a non-empty answer
    AnswerReceived,
    /// Response status >= 500
    FatalStatus,
    TransportClosed,
    TransportFailed,
    /// `disconnect` was called
    LocalClose,
}

impl SessionState {
    /// Transition table. `None` means the input is not legal in this state.
    pub fn next(self, transition: Transition) -> Option<SessionState> {
        use SessionState::*;
        use Transition::*;

        match (self, transition) {
            (Idle, Connect) => Some(Connecting),
            (Connecting, TransportOpened) => Some(Connected),
            (Connected | Negotiating | Open, OfferSent) => Some(Negotiating),
            (Negotiating, OfferFailed) => Some(Connected),
            (Connected | Negotiating | Open, AnswerReceived) => Some(Open),
            (Connected | Negotiating | Open, FatalStatus) => Some(Closed),
            (Connecting | Connected | Negotiating | Open, TransportClosed | LocalClose) => Some(Closed),
            (Connecting | Connected | Negotiating | Open, TransportFailed) => Some(Failed),
            // Terminal states absorb late teardown events
            (Closed, TransportClosed | TransportFailed | LocalClose) => Some(Closed),
            (Failed, TransportClosed | TransportFailed | LocalClose) => Some(Failed),
            _ => None,
        }
    }

    /// Transport is open and the session still accepts offers
    pub fn is_live(self) -> bool {
        matches!(
            self,
            SessionState::Connected | SessionState::Negotiating | SessionState::Open
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }

    pub fn as_u32(self) -> u32 {
        match self {
            SessionState::Idle => SESSION_STATE_IDLE,
            SessionState::Connecting => SESSION_STATE_CONNECTING,
            SessionState::Connected => SESSION_STATE_CONNECTED,
            SessionState::Negotiating => SESSION_STATE_NEGOTIATING,
            SessionState::Open => SESSION_STATE_OPEN,
            SessionState::Closed => SESSION_STATE_CLOSED,
            SessionState::Failed => SESSION_STATE_FAILED,
        }
    }
}

/// Normalized identifiers of one connection attempt, fixed at connect time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub server_url: String,
    pub application_name: String,
    pub stream_name: String,
}

impl SessionIdentity {
    pub fn new(server_url: &str, application_name: &str, stream_name: &str) -> Self {
        Self {
            server_url: sanitize(server_url),
            application_name: sanitize(application_name),
            stream_name: sanitize(stream_name),
        }
    }
}

/// Session core shared between the client and its transport worker
pub struct Session {
    state: Mutex<SessionState>,
    /// Set by the first successful response that carries one
    session_id: OnceLock<i64>,
    /// Cleared on disconnect so no callback reaches a torn-down host
    listener: Mutex<Option<Arc<dyn SignalingListener>>>,
    /// Track if disconnected has already been fired
    disconnected_fired: AtomicBool,
    pub stats: SignalingStats,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::Idle),
            session_id: OnceLock::new(),
            listener: Mutex::new(None),
            disconnected_fired: AtomicBool::new(false),
            stats: SignalingStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn session_id(&self) -> Option<i64> {
        self.session_id.get().copied()
    }

    /// Leave `Idle` and install the listener. A session connects once.
    pub fn begin(&self, listener: Arc<dyn SignalingListener>) -> Result<()> {
        let mut state = self.state.lock();
        let next = state
            .next(Transition::Connect)
            .ok_or(SignalingError::AlreadyConnected)?;
        *state = next;
        *self.listener.lock() = Some(listener);
        Ok(())
    }

    /// Apply a transition; illegal inputs leave the state untouched.
    pub fn transition(&self, transition: Transition) -> Option<SessionState> {
        let mut state = self.state.lock();
        match state.next(transition) {
            Some(next) => {
                if next != *state {
                    debug!("Session {:?} -> {:?} ({:?})", *state, next, transition);
                }
                *state = next;
                Some(next)
            }
            None => {
                debug!("Ignoring {:?} in state {:?}", transition, *state);
                None
            }
        }
    }

    /// Drop the listener; later events are swallowed
    pub fn neutralize(&self) {
        self.listener.lock().take();
    }

    pub fn has_listener(&self) -> bool {
        self.listener.lock().is_some()
    }

    fn with_listener(&self, f: impl FnOnce(&dyn SignalingListener)) {
        // Never call out while holding the lock; the host may re-enter
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            f(listener.as_ref());
        }
    }

    /// Fire the disconnected callback (only fires once per session)
    fn fire_disconnected(&self) {
        if self
            .disconnected_fired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.with_listener(|l| l.on_disconnected());
        }
    }

    fn capture_session_id(&self, id: i64) {
        match self.session_id.set(id) {
            Ok(()) => info!("Session ID: {}", id),
            Err(_) => {
                if self.session_id() != Some(id) {
                    warn!("Ignoring session ID {}, already {:?}", id, self.session_id());
                }
            }
        }
    }

    /// React to one decoded server message
    pub fn handle_message(&self, msg: &SignalingMessage) {
        let state = self.state();
        if !state.is_live() {
            debug!("Ignoring status {} in state {:?}", msg.status, state);
            return;
        }

        if msg.is_success() {
            if let Some(id) = msg.session_id() {
                self.capture_session_id(id);
            }

            if !msg.is_response_to(COMMAND_SEND_OFFER) {
                info!("Response received for {:?}", msg.command);
                return;
            }

            info!("sendOffer response received");
            if let Some(sdp) = msg.answer_sdp() {
                self.transition(Transition::AnswerReceived);
                self.with_listener(|l| l.on_opened(sdp));
            }

            if let Some(candidates) = &msg.ice_candidates {
                for candidate in candidates {
                    match candidate.candidate_json() {
                        Some(json) => {
                            self.stats.candidates_received.fetch_add(1, Ordering::Relaxed);
                            self.with_listener(|l| l.on_remote_ice_candidate(&json));
                        }
                        None => warn!("Skipping ICE candidate without candidate field"),
                    }
                }
                // End of this batch
                self.with_listener(|l| l.on_remote_ice_candidate(""));
            }
        } else if msg.is_fatal() {
            warn!("Server returned status code: {}", msg.status);
            self.transition(Transition::FatalStatus);
            self.fire_disconnected();
        } else {
            info!("Message received with status {}", msg.status);
        }
    }
}

impl TransportEvents for Session {
    fn on_transport_opened(&self) {
        if self.transition(Transition::TransportOpened).is_some() {
            self.with_listener(|l| l.on_connected());
            self.with_listener(|l| l.on_logged(0));
        }
    }

    fn on_transport_message(&self, payload: &str) {
        self.stats.frames_received.fetch_add(1, Ordering::Relaxed);
        match codec::decode_message(payload) {
            Ok(Inbound::Message(msg)) => {
                debug!("Message received:\n{}", payload);
                self.handle_message(&msg);
            }
            Ok(Inbound::Ignorable) => {
                self.stats.frames_ignored.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.stats.frames_malformed.fetch_add(1, Ordering::Relaxed);
                debug!("{}", e);
            }
        }
    }

    fn on_transport_closed(&self) {
        info!("Signaling connection closed");
        self.transition(Transition::TransportClosed);
        self.fire_disconnected();
    }

    fn on_transport_failed(&self, reason: &str) {
        info!("Signaling connection failed: {}", reason);
        self.transition(Transition::TransportFailed);
        self.fire_disconnected();
    }
}
