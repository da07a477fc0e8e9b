//! Error types for the signaling client.

use thiserror::Error;

/// Errors that can occur while talking to the signaling server
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalingError {
    /// Malformed URL or TLS context setup failure
    #[error("Failed to initialize transport: {0}")]
    TransportInit(String),

    /// Send attempted on a connection that is not open
    #[error("Failed to send frame: {0}")]
    SendFailed(String),

    /// Inbound payload is not valid JSON (or not the expected shape)
    #[error("Malformed signaling frame: {0}")]
    MalformedFrame(String),

    /// Server reported a status code >= 500
    #[error("Server returned fatal status {0}")]
    ProtocolFatal(i64),

    /// `connect` called on a session that was already started
    #[error("Session already connected")]
    AlreadyConnected,

    /// Operation needs a live connection
    #[error("Session not connected")]
    NotConnected,
}

impl SignalingError {
    /// Numeric code reported through the C API
    pub fn code(&self) -> i32 {
        match self {
            SignalingError::TransportInit(_) => SIGNALING_ERROR_INIT,
            SignalingError::SendFailed(_) => SIGNALING_ERROR_SEND,
            SignalingError::MalformedFrame(_) => SIGNALING_ERROR_FRAME,
            SignalingError::ProtocolFatal(_) => SIGNALING_ERROR_FATAL,
            SignalingError::AlreadyConnected => SIGNALING_ERROR_ALREADY,
            SignalingError::NotConnected => SIGNALING_ERROR_NOTCONN,
        }
    }
}

// Error codes (SIGNALING_ErrorGetCode)
pub const SIGNALING_OK: i32 = 0;
pub const SIGNALING_ERROR_HANDLE: i32 = 5;
pub const SIGNALING_ERROR_ILLPARAM: i32 = 20;
pub const SIGNALING_ERROR_INIT: i32 = 100;
pub const SIGNALING_ERROR_SEND: i32 = 101;
pub const SIGNALING_ERROR_FRAME: i32 = 102;
pub const SIGNALING_ERROR_FATAL: i32 = 103;
pub const SIGNALING_ERROR_ALREADY: i32 = 104;
pub const SIGNALING_ERROR_NOTCONN: i32 = 105;

pub type Result<T> = std::result::Result<T, SignalingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SignalingError::ProtocolFatal(503);
        assert_eq!(err.to_string(), "Server returned fatal status 503");

        let err = SignalingError::TransportInit("bad url".to_string());
        assert!(err.to_string().contains("bad url"));
    }

    #[test]
    fn test_error_codes_distinct() {
        let errors = [
            SignalingError::TransportInit(String::new()),
            SignalingError::SendFailed(String::new()),
            SignalingError::MalformedFrame(String::new()),
            SignalingError::ProtocolFatal(500),
            SignalingError::AlreadyConnected,
            SignalingError::NotConnected,
        ];
        let mut codes: Vec<i32> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
