//! Signaling client: the operations a host calls.
//!
//! Flow:
//! 1. `connect` validates the identifiers and starts the WebSocket worker
//! 2. The worker reports the open connection (`on_connected`, `on_logged(0)`)
//! 3. `open` publishes the local SDP offer
//! 4. The server answers with SDP, ICE candidates and a session id
//! 5. `disconnect` closes the socket and stops the worker

use std::sync::atomic::Ordering;
use std::sync::{Arc, OnceLock};

use log::{debug, error, info, warn};
use parking_lot::Mutex;

use super::codec;
use super::listener::SignalingListener;
use super::session::{Session, SessionIdentity, SessionState, Transition};
use super::stats::SignalingStatsSnapshot;
use crate::config::SignalingConfig;
use crate::error::{Result, SignalingError};
use crate::sanitize::sanitize;
use crate::transport::{LinkState, WsConnection};

/// WebRTC publish signaling client for one stream.
///
/// A client connects once; create a new one to reconnect.
pub struct SignalingClient {
    config: SignalingConfig,
    session: Arc<Session>,
    identity: OnceLock<SessionIdentity>,
    /// The single connection; `None` before connect and after disconnect
    connection: Mutex<Option<WsConnection>>,
}

impl Default for SignalingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalingClient {
    pub fn new() -> Self {
        Self::with_config(SignalingConfig::default())
    }

    pub fn with_config(config: SignalingConfig) -> Self {
        Self {
            config,
            session: Arc::new(Session::new()),
            identity: OnceLock::new(),
            connection: Mutex::new(None),
        }
    }

    /// Connect to the signaling server.
    ///
    /// # Arguments
    /// * `url` - Signaling endpoint (e.g., "wss://host.example.com/webrtc-session.json")
    /// * `application_name` - Server application (e.g., "live")
    /// * `stream_name` - Stream to publish
    /// * `token` - Accepted for API compatibility, not used by this protocol
    /// * `listener` - Receives session events from the worker thread
    ///
    /// Returns once the worker is started; the handshake result arrives
    /// through the listener.
    pub fn connect(
        &self,
        url: &str,
        application_name: &str,
        stream_name: &str,
        token: &str,
        listener: Arc<dyn SignalingListener>,
    ) -> bool {
        match self.try_connect(url, application_name, stream_name, token, listener) {
            Ok(()) => true,
            Err(e) => {
                warn!("connect failed: {}", e);
                false
            }
        }
    }

    /// [`connect`](Self::connect) with the error kept
    pub fn try_connect(
        &self,
        url: &str,
        application_name: &str,
        stream_name: &str,
        _token: &str,
        listener: Arc<dyn SignalingListener>,
    ) -> Result<()> {
        let identity = SessionIdentity::new(url, application_name, stream_name);

        info!("Server URL:       {}", identity.server_url);
        info!("Application Name: {}", identity.application_name);
        info!("Stream Name:      {}", identity.stream_name);

        self.session.begin(listener)?;
        let identity = self.identity.get_or_init(|| identity);

        // Held across the spawn so a callback calling open() waits for us
        let mut connection = self.connection.lock();
        let thread_name = format!("{}-{}", self.config.thread_name, identity.stream_name)
            .replace('\0', "");

        match WsConnection::connect(
            &identity.server_url,
            &self.config,
            &thread_name,
            self.session.clone(),
        ) {
            Ok(conn) => {
                *connection = Some(conn);
                Ok(())
            }
            Err(e) => {
                error!("Error establishing websocket connection: {}", e);
                self.session.transition(Transition::TransportFailed);
                self.session.neutralize();
                Err(e)
            }
        }
    }

    /// Publish the local SDP offer.
    ///
    /// # Arguments
    /// * `sdp` - Local offer SDP
    /// * `codec` - Accepted for API compatibility, not used by this protocol
    /// * `stream_name` - Stream to publish; empty means the one given to connect
    pub fn open(&self, sdp: &str, codec: &str, stream_name: &str) -> bool {
        match self.try_open(sdp, codec, stream_name) {
            Ok(()) => true,
            Err(e) => {
                warn!("open failed: {}", e);
                false
            }
        }
    }

    /// [`open`](Self::open) with the error kept
    pub fn try_open(&self, sdp: &str, _codec: &str, stream_name: &str) -> Result<()> {
        let identity = self.identity.get().ok_or(SignalingError::NotConnected)?;

        let stream_name = match sanitize(stream_name) {
            s if s.is_empty() => identity.stream_name.clone(),
            s => s,
        };
        let offer = codec::encode_offer(&identity.application_name, &stream_name, sdp)?;

        let connection = self.connection.lock();

        // The transition is the liveness check; the worker may have closed
        // the session since the caller last looked
        if self.session.transition(Transition::OfferSent).is_none() {
            return Err(SignalingError::SendFailed(format!(
                "session is {:?}",
                self.session.state()
            )));
        }
        let Some(conn) = connection.as_ref() else {
            self.session.transition(Transition::OfferFailed);
            return Err(SignalingError::NotConnected);
        };

        info!("Sending offer...");
        if let Err(e) = conn.send(offer) {
            warn!("Error sending offer: {}", e);
            self.session.transition(Transition::OfferFailed);
            return Err(e);
        }

        self.session.stats.offers_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Local ICE candidate.
    ///
    /// Candidates travel in-band with the offer for this server, so this
    /// only logs and always succeeds.
    pub fn trickle(&self, _mid: &str, _index: i32, candidate: &str, _last: bool) -> bool {
        debug!("Trickle candidate: {}", candidate);
        true
    }

    /// Close the connection and stop the worker.
    ///
    /// With `wait` the call blocks until the worker exits (bounded by the
    /// configured join timeout); otherwise the worker is detached. The
    /// listener is released either way, so no callback arrives once this
    /// returns after a successful join. Safe to call repeatedly.
    pub fn disconnect(&self, wait: bool) -> bool {
        let Some(conn) = self.connection.lock().take() else {
            return true;
        };

        if conn.state() == LinkState::Open {
            if let Err(e) = conn.close("disconnect") {
                warn!("Error on disconnect close: {}", e);
            }
        }

        // Don't wait for the close handshake
        conn.stop();
        self.session.transition(Transition::LocalClose);
        self.session.neutralize();

        if wait && !conn.is_worker_thread() && conn.join(self.config.join_timeout) {
            debug!("Signaling worker joined");
        } else {
            conn.detach();
        }
        true
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Transport open and session usable
    pub fn is_connected(&self) -> bool {
        self.session.state().is_live()
    }

    /// Server assigned session id, once known
    pub fn session_id(&self) -> Option<i64> {
        self.session.session_id()
    }

    /// Identifiers fixed at connect time
    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.identity.get()
    }

    pub fn config(&self) -> &SignalingConfig {
        &self.config
    }

    pub fn stats(&self) -> SignalingStatsSnapshot {
        self.session.stats.to_snapshot()
    }
}

impl Drop for SignalingClient {
    fn drop(&mut self) {
        // Disconnect just in case
        self.disconnect(false);
    }
}
