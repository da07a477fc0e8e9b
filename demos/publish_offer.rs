//! Publish Offer Example
//!
//! Connects to a Wowza-style signaling endpoint, publishes a placeholder
//! SDP offer and prints every event the server sends back.
//!
//! Usage: cargo run --example publish_offer -- <wss-url> [app] [stream]

use bass_wowza_signaling::{SignalingClient, SignalingListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEMO_OFFER: &str = "v=0\r\n\
o=- 0 0 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
c=IN IP4 0.0.0.0\r\n\
a=rtpmap:111 opus/48000/2\r\n\
a=sendonly\r\n";

/// Prints events and remembers when the session is gone
struct PrintingListener {
    running: Arc<AtomicBool>,
}

impl SignalingListener for PrintingListener {
    fn on_connected(&self) {
        println!("[signaling] connected");
    }

    fn on_logged(&self, code: i32) {
        println!("[signaling] logged in (code {})", code);
    }

    fn on_opened(&self, sdp: &str) {
        println!("[signaling] answer SDP:\n{}", sdp);
    }

    fn on_remote_ice_candidate(&self, candidate: &str) {
        if candidate.is_empty() {
            println!("[signaling] end of remote candidates");
        } else {
            println!("[signaling] remote candidate: {}", candidate);
        }
    }

    fn on_disconnected(&self) {
        println!("[signaling] disconnected");
        self.running.store(false, Ordering::SeqCst);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let Some(url) = args.next() else {
        eprintln!("Usage: publish_offer <wss-url> [app] [stream]");
        return;
    };
    let app = args.next().unwrap_or_else(|| "live".to_string());
    let stream = args.next().unwrap_or_else(|| "myStream".to_string());

    println!("bass-wowza-signaling Publish Offer");
    println!("==================================");
    println!("Press Ctrl+C to stop.");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    let client = SignalingClient::new();
    let listener = Arc::new(PrintingListener {
        running: running.clone(),
    });

    if !client.connect(&url, &app, &stream, "", listener) {
        eprintln!("Failed to connect to {}", url);
        return;
    }

    // Wait for the socket before publishing
    while running.load(Ordering::SeqCst) && !client.is_connected() {
        std::thread::sleep(Duration::from_millis(50));
    }

    if running.load(Ordering::SeqCst) && !client.open(DEMO_OFFER, "opus", "") {
        eprintln!("Failed to send offer");
    }

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    if let Some(id) = client.session_id() {
        println!("Session id: {}", id);
    }
    let stats = client.stats();
    println!(
        "Offers sent: {}, frames received: {}, candidates: {}",
        stats.offers_sent, stats.frames_received, stats.candidates_received
    );

    client.disconnect(true);
    println!("Done.");
}
