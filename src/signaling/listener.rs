//! Listener contract between the signaling session and the host.
//!
//! Rust hosts implement [`SignalingListener`] directly. Plugin hosts pass a
//! [`ListenerCallbacks`] table of C function pointers instead.

use std::ffi::{c_char, c_void, CString};

/// Events the signaling session reports to its owner.
///
/// All methods are called from the session's worker thread.
pub trait SignalingListener: Send + Sync {
    /// Transport is open
    fn on_connected(&self);
    /// Logged in to the server (always code 0 for this protocol)
    fn on_logged(&self, code: i32);
    /// Answer SDP received for the published offer
    fn on_opened(&self, sdp: &str);
    /// Remote ICE candidate as JSON; an empty string ends the batch
    fn on_remote_ice_candidate(&self, candidate: &str);
    /// Session is gone (server error, close or failure)
    fn on_disconnected(&self);
}

/// FFI callback types for listener events
pub type OnConnectedCallback = unsafe extern "C" fn(user: *mut c_void);
pub type OnLoggedCallback = unsafe extern "C" fn(code: i32, user: *mut c_void);
pub type OnOpenedCallback = unsafe extern "C" fn(sdp: *const c_char, user: *mut c_void);
pub type OnRemoteIceCandidateCallback =
    unsafe extern "C" fn(candidate: *const c_char, user: *mut c_void);
pub type OnDisconnectedCallback = unsafe extern "C" fn(user: *mut c_void);

/// Listener callbacks structure (FFI-safe)
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ListenerCallbacks {
    pub on_connected: Option<OnConnectedCallback>,
    pub on_logged: Option<OnLoggedCallback>,
    pub on_opened: Option<OnOpenedCallback>,
    pub on_remote_ice_candidate: Option<OnRemoteIceCandidateCallback>,
    pub on_disconnected: Option<OnDisconnectedCallback>,
    /// User data pointer passed to all callbacks
    pub user: *mut c_void,
}

// SAFETY: The user pointer is owned by the host and stays valid until
// the client is disconnected; callbacks are plain function pointers.
unsafe impl Send for ListenerCallbacks {}
unsafe impl Sync for ListenerCallbacks {}

impl Default for ListenerCallbacks {
    fn default() -> Self {
        Self {
            on_connected: None,
            on_logged: None,
            on_opened: None,
            on_remote_ice_candidate: None,
            on_disconnected: None,
            user: std::ptr::null_mut(),
        }
    }
}

impl ListenerCallbacks {
    /// Check if any callbacks are registered
    pub fn has_callbacks(&self) -> bool {
        self.on_connected.is_some()
            || self.on_logged.is_some()
            || self.on_opened.is_some()
            || self.on_remote_ice_candidate.is_some()
            || self.on_disconnected.is_some()
    }

    fn with_cstring(&self, text: &str, f: impl FnOnce(*const c_char)) {
        // Interior NULs cannot cross the C boundary
        if let Ok(c_text) = CString::new(text) {
            f(c_text.as_ptr());
        }
    }
}

impl SignalingListener for ListenerCallbacks {
    fn on_connected(&self) {
        if let Some(cb) = self.on_connected {
            unsafe { cb(self.user) }
        }
    }

    fn on_logged(&self, code: i32) {
        if let Some(cb) = self.on_logged {
            unsafe { cb(code, self.user) }
        }
    }

    fn on_opened(&self, sdp: &str) {
        if let Some(cb) = self.on_opened {
            self.with_cstring(sdp, |ptr| unsafe { cb(ptr, self.user) });
        }
    }

    fn on_remote_ice_candidate(&self, candidate: &str) {
        if let Some(cb) = self.on_remote_ice_candidate {
            self.with_cstring(candidate, |ptr| unsafe { cb(ptr, self.user) });
        }
    }

    fn on_disconnected(&self) {
        if let Some(cb) = self.on_disconnected {
            unsafe { cb(self.user) }
        }
    }
}
