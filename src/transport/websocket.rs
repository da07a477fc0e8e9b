//! Single WebSocket connection driven by a dedicated worker thread.
//!
//! `connect` only validates the URL, prepares TLS and starts the worker;
//! the handshake itself happens once the worker's run loop is polled.
//! Outbound frames are queued to the run loop, which is the only writer
//! of the socket.

use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use rustls::ClientConfig;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::Connector;
use url::Url;

use super::{tls, LinkState, TransportEvents};
use crate::config::SignalingConfig;
use crate::error::{Result, SignalingError};

/// Work queued for the run loop
enum Command {
    Text(String),
    Close(String),
}

/// Running worker thread plus its exit signal
struct Worker {
    handle: JoinHandle<()>,
    /// Disconnects when the worker thread returns
    exited: std_mpsc::Receiver<()>,
}

/// Handle to the single WebSocket connection of a session
pub struct WsConnection {
    url: Url,
    state: Arc<Mutex<LinkState>>,
    commands: mpsc::UnboundedSender<Command>,
    stop: watch::Sender<bool>,
    worker: Mutex<Option<Worker>>,
}

impl WsConnection {
    /// Check that `url` is a `ws://` or `wss://` URL with a host.
    pub fn validate_url(url: &str) -> Result<Url> {
        let parsed = Url::parse(url)
            .map_err(|e| SignalingError::TransportInit(format!("Invalid URL '{}': {}", url, e)))?;

        match parsed.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(SignalingError::TransportInit(format!(
                    "Unsupported scheme '{}', expected ws:// or wss://",
                    other
                )));
            }
        }

        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(SignalingError::TransportInit(format!("URL '{}' has no host", url)));
        }

        Ok(parsed)
    }

    /// Request a connection and start the worker thread running the I/O loop.
    ///
    /// Returns as soon as the worker is started; `events` learns about the
    /// handshake outcome asynchronously.
    pub fn connect(
        url: &str,
        config: &SignalingConfig,
        thread_name: &str,
        events: Arc<dyn TransportEvents>,
    ) -> Result<Self> {
        let url = Self::validate_url(url)?;
        let tls = tls::client_config()?;

        let state = Arc::new(Mutex::new(LinkState::Connecting));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let (exited_tx, exited_rx) = std_mpsc::channel::<()>();

        let loop_url = url.clone();
        let loop_state = state.clone();
        let connect_timeout = config.connect_timeout;

        let handle = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                // Dropped on return, which wakes up a bounded join
                let _exited = exited_tx;

                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("Failed to create signaling runtime: {}", e);
                        *loop_state.lock() = LinkState::Closed;
                        events.on_transport_failed(&e.to_string());
                        return;
                    }
                };

                runtime.block_on(run_loop(
                    loop_url,
                    tls,
                    connect_timeout,
                    loop_state,
                    commands_rx,
                    stop_rx,
                    events,
                ));
            })
            .map_err(|e| SignalingError::TransportInit(format!("Failed to spawn worker: {}", e)))?;

        Ok(Self {
            url,
            state,
            commands: commands_tx,
            stop: stop_tx,
            worker: Mutex::new(Some(Worker {
                handle,
                exited: exited_rx,
            })),
        })
    }

    /// Server URL this connection targets
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Current link state
    pub fn state(&self) -> LinkState {
        *self.state.lock()
    }

    /// Queue a text frame. Fails unless the link is open.
    pub fn send(&self, payload: String) -> Result<()> {
        let state = self.state();
        if state != LinkState::Open {
            return Err(SignalingError::SendFailed(format!("connection is {:?}", state)));
        }
        self.commands
            .send(Command::Text(payload))
            .map_err(|_| SignalingError::SendFailed("run loop stopped".to_string()))
    }

    /// Start a graceful close if the link is open. No-op otherwise.
    pub fn close(&self, reason: &str) -> Result<()> {
        let mut state = self.state.lock();
        if *state != LinkState::Open {
            return Ok(());
        }
        *state = LinkState::Closing;
        self.commands
            .send(Command::Close(reason.to_string()))
            .map_err(|_| SignalingError::SendFailed("run loop stopped".to_string()))
    }

    /// Ask the run loop to exit. Queued frames are flushed first.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// True when called from the worker thread itself (i.e. from a callback)
    pub fn is_worker_thread(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .map_or(false, |w| w.handle.thread().id() == thread::current().id())
    }

    /// True while the worker thread has not been joined or detached
    pub fn has_worker(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Wait up to `timeout` for the worker to exit.
    ///
    /// Returns false (and leaves the worker in place) if it is still running
    /// or if called from the worker itself.
    pub fn join(&self, timeout: Duration) -> bool {
        let mut guard = self.worker.lock();
        let Some(worker) = guard.take() else {
            return true;
        };

        if worker.handle.thread().id() == thread::current().id() {
            *guard = Some(worker);
            return false;
        }

        match worker.exited.recv_timeout(timeout) {
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                warn!("Signaling worker still running after {:?}", timeout);
                *guard = Some(worker);
                false
            }
            // The sender is never used, only dropped
            Ok(()) | Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                if worker.handle.join().is_err() {
                    warn!("Signaling worker panicked");
                }
                true
            }
        }
    }

    /// Let the worker finish on its own
    pub fn detach(&self) {
        if let Some(worker) = self.worker.lock().take() {
            debug!("Detaching signaling worker {:?}", worker.handle.thread().name());
        }
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Drive one connection from handshake to close.
async fn run_loop(
    url: Url,
    tls: Arc<ClientConfig>,
    connect_timeout: Duration,
    state: Arc<Mutex<LinkState>>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut stop: watch::Receiver<bool>,
    events: Arc<dyn TransportEvents>,
) {
    let handshake = tokio_tungstenite::connect_async_tls_with_config(
        url.as_str(),
        None,
        false,
        Some(Connector::Rustls(tls)),
    );

    let ws_stream = tokio::select! {
        _ = stop.changed() => {
            debug!("Signaling stopped before handshake completed");
            *state.lock() = LinkState::Closed;
            return;
        }
        result = tokio::time::timeout(connect_timeout, handshake) => match result {
            Ok(Ok((ws_stream, _response))) => ws_stream,
            Ok(Err(e)) => {
                error!("Error establishing websocket connection: {}", e);
                *state.lock() = LinkState::Closed;
                events.on_transport_failed(&e.to_string());
                return;
            }
            Err(_) => {
                error!("Websocket handshake timed out after {:?}", connect_timeout);
                *state.lock() = LinkState::Closed;
                events.on_transport_failed("handshake timed out");
                return;
            }
        }
    };

    info!("Connected to signaling server: {}", url);
    *state.lock() = LinkState::Open;
    events.on_transport_opened();

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    loop {
        tokio::select! {
            // Queued frames go out before a stop request is honoured
            biased;

            command = commands.recv() => match command {
                Some(Command::Text(text)) => {
                    if let Err(e) = ws_sender.send(Message::Text(text)).await {
                        warn!("Failed to send frame: {}", e);
                    }
                }
                Some(Command::Close(reason)) => {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: reason.into(),
                    };
                    if let Err(e) = ws_sender.send(Message::Close(Some(frame))).await {
                        warn!("Error on disconnect close: {}", e);
                    }
                }
                None => break,
            },

            _ = stop.changed() => {
                debug!("Signaling run loop stopped");
                break;
            }

            frame = ws_receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => events.on_transport_message(&text),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => events.on_transport_message(&text),
                    Err(_) => debug!("Ignoring non UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    // Keep reading so the close reply gets flushed
                    info!("Server closed signaling connection: {:?}", frame);
                    *state.lock() = LinkState::Closing;
                }
                // Ping/pong are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    *state.lock() = LinkState::Closed;
                    events.on_transport_closed();
                    return;
                }
                Some(Err(e)) => {
                    warn!("Websocket error: {}", e);
                    *state.lock() = LinkState::Closed;
                    events.on_transport_failed(&e.to_string());
                    return;
                }
            }
        }
    }

    *state.lock() = LinkState::Closed;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{refused_url, LoopbackServer, RecordingTransport, TransportEvent};

    fn test_config() -> SignalingConfig {
        SignalingConfig {
            connect_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_url() {
        assert!(WsConnection::validate_url("wss://host.example.com/webrtc-session.json").is_ok());
        assert!(WsConnection::validate_url("ws://127.0.0.1:8080").is_ok());

        for bad in ["", "not a url", "https://host/app", "wss://", "file:///tmp/x"] {
            match WsConnection::validate_url(bad) {
                Err(SignalingError::TransportInit(_)) => {}
                other => panic!("expected TransportInit for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_connect_rejects_bad_url_without_thread() {
        let events = Arc::new(RecordingTransport::default());
        let result = WsConnection::connect("http://host/app", &test_config(), "test", events.clone());
        assert!(matches!(result, Err(SignalingError::TransportInit(_))));
        assert!(events.events().is_empty());
    }

    #[test]
    fn test_open_send_and_receive() {
        let server = LoopbackServer::start();
        let events = Arc::new(RecordingTransport::default());
        let conn = WsConnection::connect(&server.url, &test_config(), "test", events.clone()).unwrap();

        assert!(events.wait_for(|e| e.contains(&TransportEvent::Opened)));
        assert_eq!(conn.state(), LinkState::Open);

        conn.send("{\"hello\":1}".to_string()).unwrap();
        assert_eq!(server.next_frame().as_deref(), Some("{\"hello\":1}"));

        server.push("{\"status\":200}");
        assert!(events.wait_for(|e| e.contains(&TransportEvent::Message("{\"status\":200}".into()))));

        conn.stop();
        assert!(conn.join(Duration::from_secs(5)));
        assert_eq!(conn.state(), LinkState::Closed);
        assert!(!conn.has_worker());
    }

    #[test]
    fn test_send_before_open_fails() {
        // Worker is stopped before it gets anywhere
        let events = Arc::new(RecordingTransport::default());
        let conn = WsConnection::connect(&refused_url(), &test_config(), "test", events).unwrap();
        conn.stop();
        assert!(conn.join(Duration::from_secs(5)));
        assert!(matches!(
            conn.send("x".to_string()),
            Err(SignalingError::SendFailed(_))
        ));
    }

    #[test]
    fn test_refused_connection_reports_failure() {
        let events = Arc::new(RecordingTransport::default());
        let conn = WsConnection::connect(&refused_url(), &test_config(), "test", events.clone()).unwrap();
        assert!(events.wait_for(|e| e.iter().any(|ev| matches!(ev, TransportEvent::Failed(_)))));
        assert!(conn.join(Duration::from_secs(5)));
        assert!(!events.events().contains(&TransportEvent::Opened));
    }

    #[test]
    fn test_server_close_reports_closed() {
        let server = LoopbackServer::start();
        let events = Arc::new(RecordingTransport::default());
        let conn = WsConnection::connect(&server.url, &test_config(), "test", events.clone()).unwrap();
        assert!(events.wait_for(|e| e.contains(&TransportEvent::Opened)));

        server.close();
        assert!(events.wait_for(|e| e.contains(&TransportEvent::Closed)));
        assert!(conn.join(Duration::from_secs(5)));
        assert!(matches!(
            conn.send("late".to_string()),
            Err(SignalingError::SendFailed(_))
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        let server = LoopbackServer::start();
        let events = Arc::new(RecordingTransport::default());
        let conn = WsConnection::connect(&server.url, &test_config(), "test", events.clone()).unwrap();
        assert!(events.wait_for(|e| e.contains(&TransportEvent::Opened)));

        conn.close("disconnect").unwrap();
        assert_eq!(conn.state(), LinkState::Closing);
        conn.close("disconnect").unwrap();

        assert!(events.wait_for(|e| e.contains(&TransportEvent::Closed)));
        conn.close("again").unwrap();
        assert!(conn.join(Duration::from_secs(5)));
    }
}
