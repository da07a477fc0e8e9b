//! Test helpers: loopback WebSocket server and recording event sinks.

use std::net::TcpListener as StdTcpListener;
use std::sync::mpsc as std_mpsc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::signaling::SignalingListener;
use crate::transport::TransportEvents;

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Marker pushed into the received queue when the client sends a close frame
pub const CLOSE_MARKER: &str = "<close>";

/// Poll `check` until it returns true or the timeout expires
fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    check()
}

/// A URL nothing is listening on
pub fn refused_url() -> String {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}", addr)
}

enum ServerAction {
    Text(String),
    Close,
}

/// Accepts one WebSocket client on 127.0.0.1 and lets the test script it
pub struct LoopbackServer {
    pub url: String,
    received: std_mpsc::Receiver<String>,
    actions: mpsc::UnboundedSender<ServerAction>,
    _runtime: Runtime,
}

impl LoopbackServer {
    pub fn start() -> Self {
        let runtime = Runtime::new().unwrap();
        let listener = runtime.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
        let addr = listener.local_addr().unwrap();

        let (received_tx, received_rx) = std_mpsc::channel();
        let (actions_tx, mut actions_rx) = mpsc::unbounded_channel();

        runtime.spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let Ok(ws_stream) = tokio_tungstenite::accept_async(stream).await else {
                return;
            };
            let (mut ws_sender, mut ws_receiver) = ws_stream.split();

            loop {
                tokio::select! {
                    action = actions_rx.recv() => match action {
                        Some(ServerAction::Text(text)) => {
                            if ws_sender.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        Some(ServerAction::Close) => {
                            let _ = ws_sender.send(Message::Close(None)).await;
                        }
                        None => break,
                    },
                    frame = ws_receiver.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            let _ = received_tx.send(text);
                        }
                        Some(Ok(Message::Close(_))) => {
                            let _ = received_tx.send(CLOSE_MARKER.to_string());
                        }
                        Some(Ok(_)) => {}
                        _ => break,
                    }
                }
            }
        });

        Self {
            url: format!("ws://{}", addr),
            received: received_rx,
            actions: actions_tx,
            _runtime: runtime,
        }
    }

    /// Send a text frame to the client
    pub fn push(&self, text: &str) {
        let _ = self.actions.send(ServerAction::Text(text.to_string()));
    }

    /// Start a close handshake from the server side
    pub fn close(&self) {
        let _ = self.actions.send(ServerAction::Close);
    }

    /// Next frame the client sent, if one arrives in time
    pub fn next_frame(&self) -> Option<String> {
        self.received.recv_timeout(WAIT_TIMEOUT).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Closed,
    Failed(String),
}

/// Records transport callbacks in arrival order
#[derive(Default)]
pub struct RecordingTransport {
    events: Mutex<Vec<TransportEvent>>,
}

impl RecordingTransport {
    pub fn events(&self) -> Vec<TransportEvent> {
        self.events.lock().clone()
    }

    pub fn wait_for(&self, check: impl Fn(&[TransportEvent]) -> bool) -> bool {
        wait_until(|| check(&self.events.lock()))
    }
}

impl TransportEvents for RecordingTransport {
    fn on_transport_opened(&self) {
        self.events.lock().push(TransportEvent::Opened);
    }

    fn on_transport_message(&self, payload: &str) {
        self.events.lock().push(TransportEvent::Message(payload.to_string()));
    }

    fn on_transport_closed(&self) {
        self.events.lock().push(TransportEvent::Closed);
    }

    fn on_transport_failed(&self, reason: &str) {
        self.events.lock().push(TransportEvent::Failed(reason.to_string()));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connected,
    Logged(i32),
    Opened(String),
    Candidate(String),
    Disconnected,
}

/// Records listener callbacks in arrival order
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<Event>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events.lock().iter().filter(|e| *e == event).count()
    }

    pub fn wait_for(&self, check: impl Fn(&[Event]) -> bool) -> bool {
        wait_until(|| check(&self.events.lock()))
    }
}

impl SignalingListener for RecordingListener {
    fn on_connected(&self) {
        self.events.lock().push(Event::Connected);
    }

    fn on_logged(&self, code: i32) {
        self.events.lock().push(Event::Logged(code));
    }

    fn on_opened(&self, sdp: &str) {
        self.events.lock().push(Event::Opened(sdp.to_string()));
    }

    fn on_remote_ice_candidate(&self, candidate: &str) {
        self.events.lock().push(Event::Candidate(candidate.to_string()));
    }

    fn on_disconnected(&self) {
        self.events.lock().push(Event::Disconnected);
    }
}
