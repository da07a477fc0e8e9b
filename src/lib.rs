//! bass-wowza-signaling: WebRTC publish signaling for Wowza-style servers.
//!
//! Connects to a media server's WebSocket signaling endpoint, sends the
//! local SDP offer, and reports the answer, remote ICE candidates and the
//! server session id back to the host.
//!
//! ## Features
//!
//! - **wss:// with TLS 1.2+** (rustls, webpki roots)
//! - **One worker thread per client** driving the WebSocket
//! - **Rust listener trait or C callback table** for events
//! - **C API** (`SIGNALING_*`) for plugin hosts

#![allow(non_snake_case)]

use std::cell::Cell;
use std::ffi::{c_char, c_void, CStr};
use std::sync::Arc;

pub mod config;
pub mod error;
pub mod sanitize;
pub mod signaling;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::{SignalingConfig, SignalingConfigFFI};
pub use error::SignalingError;
pub use sanitize::sanitize;
pub use signaling::{
    ListenerCallbacks, SessionState, SignalingClient, SignalingListener, SignalingStatsSnapshot,
};
pub use transport::{LinkState, TransportEvents, WsConnection};

use error::*;

// ============================================================================
// Last error (per calling thread)
// ============================================================================

thread_local! {
    static LAST_ERROR: Cell<i32> = const { Cell::new(SIGNALING_OK) };
}

fn set_error(code: i32) {
    LAST_ERROR.with(|e| e.set(code));
}

/// Read an optional C string argument
unsafe fn cstr_arg(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

// ============================================================================
// FFI API
// ============================================================================

/// Install an env_logger backend (`RUST_LOG`, default "info").
///
/// # Returns
/// 1 if installed, 0 if a logger was already set
#[no_mangle]
pub extern "system" fn SIGNALING_InitLogging() -> i32 {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init()
        .is_ok() as i32
}

/// Error code of the last failed call on this thread.
#[no_mangle]
pub extern "system" fn SIGNALING_ErrorGetCode() -> i32 {
    LAST_ERROR.with(|e| e.get())
}

/// Create a signaling client.
///
/// # Arguments
/// * `config` - Client configuration (null for defaults)
///
/// # Returns
/// Opaque handle (free with SIGNALING_Free)
#[no_mangle]
pub unsafe extern "system" fn SIGNALING_Create(config: *const SignalingConfigFFI) -> *mut c_void {
    let cfg = if config.is_null() {
        SignalingConfigFFI::default()
    } else {
        *config
    };

    set_error(SIGNALING_OK);
    Box::into_raw(Box::new(SignalingClient::with_config(cfg.into()))) as *mut c_void
}

/// Connect to the signaling server.
///
/// # Arguments
/// * `handle` - Handle from SIGNALING_Create
/// * `url` - Signaling endpoint (e.g., "wss://host.example.com/webrtc-session.json")
/// * `app_name` - Server application name
/// * `stream_name` - Stream to publish
/// * `token` - Auth token (may be null; unused by this protocol)
/// * `callbacks` - Listener callbacks (copied)
///
/// # Returns
/// 1 if the connection was requested, 0 on failure
#[no_mangle]
pub unsafe extern "system" fn SIGNALING_Connect(
    handle: *mut c_void,
    url: *const c_char,
    app_name: *const c_char,
    stream_name: *const c_char,
    token: *const c_char,
    callbacks: *const ListenerCallbacks,
) -> i32 {
    if handle.is_null() {
        set_error(SIGNALING_ERROR_HANDLE);
        return 0;
    }

    let (Some(url), Some(app_name), Some(stream_name)) =
        (cstr_arg(url), cstr_arg(app_name), cstr_arg(stream_name))
    else {
        set_error(SIGNALING_ERROR_ILLPARAM);
        return 0;
    };
    let token = cstr_arg(token).unwrap_or_default();
    let callbacks = if callbacks.is_null() {
        ListenerCallbacks::default()
    } else {
        *callbacks
    };

    let client = &*(handle as *const SignalingClient);
    match client.try_connect(&url, &app_name, &stream_name, &token, Arc::new(callbacks)) {
        Ok(()) => {
            set_error(SIGNALING_OK);
            1
        }
        Err(e) => {
            log::warn!("SIGNALING_Connect error: {}", e);
            set_error(e.code());
            0
        }
    }
}

/// Publish the local SDP offer.
///
/// # Arguments
/// * `handle` - Handle from SIGNALING_Create
/// * `sdp` - Local offer SDP
/// * `codec` - Codec hint (may be null; unused by this protocol)
/// * `stream_name` - Stream to publish (null or empty for the connect stream)
///
/// # Returns
/// 1 if the offer was queued, 0 on failure
#[no_mangle]
pub unsafe extern "system" fn SIGNALING_Open(
    handle: *mut c_void,
    sdp: *const c_char,
    codec: *const c_char,
    stream_name: *const c_char,
) -> i32 {
    if handle.is_null() {
        set_error(SIGNALING_ERROR_HANDLE);
        return 0;
    }
    let Some(sdp) = cstr_arg(sdp) else {
        set_error(SIGNALING_ERROR_ILLPARAM);
        return 0;
    };
    let codec = cstr_arg(codec).unwrap_or_default();
    let stream_name = cstr_arg(stream_name).unwrap_or_default();

    let client = &*(handle as *const SignalingClient);
    match client.try_open(&sdp, &codec, &stream_name) {
        Ok(()) => {
            set_error(SIGNALING_OK);
            1
        }
        Err(e) => {
            log::warn!("SIGNALING_Open error: {}", e);
            set_error(e.code());
            0
        }
    }
}

/// Hand over a local ICE candidate (logged only; see SignalingClient::trickle).
///
/// # Returns
/// 1 on success, 0 on invalid handle
#[no_mangle]
pub unsafe extern "system" fn SIGNALING_Trickle(
    handle: *mut c_void,
    mid: *const c_char,
    index: i32,
    candidate: *const c_char,
    last: i32,
) -> i32 {
    if handle.is_null() {
        set_error(SIGNALING_ERROR_HANDLE);
        return 0;
    }

    let client = &*(handle as *const SignalingClient);
    let mid = cstr_arg(mid).unwrap_or_default();
    let candidate = cstr_arg(candidate).unwrap_or_default();
    set_error(SIGNALING_OK);
    client.trickle(&mid, index, &candidate, last != 0) as i32
}

/// Disconnect from the signaling server.
///
/// # Arguments
/// * `handle` - Handle from SIGNALING_Create
/// * `wait` - Non-zero to block until the worker thread exits
///
/// # Returns
/// 1 on success, 0 on invalid handle
#[no_mangle]
pub unsafe extern "system" fn SIGNALING_Disconnect(handle: *mut c_void, wait: i32) -> i32 {
    if handle.is_null() {
        set_error(SIGNALING_ERROR_HANDLE);
        return 0;
    }

    let client = &*(handle as *const SignalingClient);
    set_error(SIGNALING_OK);
    client.disconnect(wait != 0) as i32
}

/// Get the server assigned session id.
///
/// # Returns
/// 1 and `*session_id` set if known, 0 otherwise
#[no_mangle]
pub unsafe extern "system" fn SIGNALING_GetSessionId(
    handle: *mut c_void,
    session_id: *mut i64,
) -> i32 {
    if handle.is_null() || session_id.is_null() {
        set_error(SIGNALING_ERROR_HANDLE);
        return 0;
    }

    let client = &*(handle as *const SignalingClient);
    match client.session_id() {
        Some(id) => {
            *session_id = id;
            set_error(SIGNALING_OK);
            1
        }
        None => {
            set_error(SIGNALING_ERROR_NOTCONN);
            0
        }
    }
}

/// Get the session state (SESSION_STATE_* constants).
#[no_mangle]
pub unsafe extern "system" fn SIGNALING_GetState(handle: *mut c_void) -> u32 {
    if handle.is_null() {
        set_error(SIGNALING_ERROR_HANDLE);
        return signaling::SESSION_STATE_IDLE;
    }

    let client = &*(handle as *const SignalingClient);
    client.state().as_u32()
}

/// Get signaling statistics.
///
/// # Returns
/// 1 on success, 0 on failure
#[no_mangle]
pub unsafe extern "system" fn SIGNALING_GetStats(
    handle: *mut c_void,
    stats: *mut SignalingStatsSnapshot,
) -> i32 {
    if handle.is_null() || stats.is_null() {
        set_error(SIGNALING_ERROR_HANDLE);
        return 0;
    }

    let client = &*(handle as *const SignalingClient);
    *stats = client.stats();
    set_error(SIGNALING_OK);
    1
}

/// Free a client. Disconnects without waiting if still connected.
///
/// # Returns
/// 1 on success, 0 on invalid handle
#[no_mangle]
pub unsafe extern "system" fn SIGNALING_Free(handle: *mut c_void) -> i32 {
    if handle.is_null() {
        set_error(SIGNALING_ERROR_HANDLE);
        return 0;
    }

    let _ = Box::from_raw(handle as *mut SignalingClient);
    set_error(SIGNALING_OK);
    1
}
