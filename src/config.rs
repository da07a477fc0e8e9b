//! Client configuration.

use std::time::Duration;

const DEFAULT_JOIN_TIMEOUT_MS: u32 = 5000;
const DEFAULT_CONNECT_TIMEOUT_MS: u32 = 10000;
const DEFAULT_THREAD_NAME: &str = "wowza-signaling";

/// Signaling client configuration
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Upper bound for `disconnect(true)`; the worker is detached afterwards
    pub join_timeout: Duration,
    /// Upper bound for the WebSocket + TLS handshake
    pub connect_timeout: Duration,
    /// Worker thread name prefix (stream name is appended)
    pub thread_name: String,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            join_timeout: Duration::from_millis(DEFAULT_JOIN_TIMEOUT_MS as u64),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS as u64),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

/// Client configuration (FFI-safe). Zero fields fall back to defaults.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SignalingConfigFFI {
    /// Bound for a blocking disconnect in milliseconds (default 5000)
    pub join_timeout_ms: u32,
    /// Handshake timeout in milliseconds (default 10000)
    pub connect_timeout_ms: u32,
}

impl Default for SignalingConfigFFI {
    fn default() -> Self {
        Self {
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl From<SignalingConfigFFI> for SignalingConfig {
    fn from(ffi: SignalingConfigFFI) -> Self {
        let or_default = |ms: u32, default: u32| {
            Duration::from_millis(if ms == 0 { default } else { ms } as u64)
        };
        Self {
            join_timeout: or_default(ffi.join_timeout_ms, DEFAULT_JOIN_TIMEOUT_MS),
            connect_timeout: or_default(ffi.connect_timeout_ms, DEFAULT_CONNECT_TIMEOUT_MS),
            ..Default::default()
        }
    }
}
