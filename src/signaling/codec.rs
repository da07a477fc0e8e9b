//! Wire format of the Wowza WebRTC signaling protocol.
//!
//! Outbound commands are JSON text frames:
//!
//! ```json
//! { "direction": "publish", "command": "sendOffer",
//!   "streamInfo": { "applicationName": "live", "streamName": "cam1", "sessionId": "[empty]" },
//!   "sdp": { "type": "offer", "sdp": "v=0..." } }
//! ```
//!
//! Responses carry a mandatory `status`, everything else is optional:
//!
//! ```json
//! { "status": 200, "command": "sendOffer",
//!   "sdp": { "type": "answer", "sdp": "v=0..." },
//!   "iceCandidates": [ { "candidate": "candidate:1 1 UDP ...", "sdpMid": "0", "sdpMLineIndex": 0 } ],
//!   "streamInfo": { "sessionId": "12345" } }
//! ```

use log::debug;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SignalingError};

/// Publish direction (the only one this client speaks)
pub const DIRECTION_PUBLISH: &str = "publish";
/// Offer command name, also echoed in its response
pub const COMMAND_SEND_OFFER: &str = "sendOffer";
/// The server assigns the real session id in its response
pub const SESSION_ID_PLACEHOLDER: &str = "[empty]";
/// Successful response status
pub const STATUS_OK: i64 = 200;
/// First status the server uses for fatal errors
pub const STATUS_FATAL: i64 = 500;

/// Outbound `sendOffer` command
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferRequest<'a> {
    pub direction: &'a str,
    pub command: &'a str,
    pub stream_info: OfferStreamInfo<'a>,
    pub sdp: OfferSdp<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferStreamInfo<'a> {
    pub application_name: &'a str,
    pub stream_name: &'a str,
    pub session_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct OfferSdp<'a> {
    #[serde(rename = "type")]
    pub sdp_type: &'a str,
    pub sdp: &'a str,
}

impl<'a> OfferRequest<'a> {
    pub fn new(application_name: &'a str, stream_name: &'a str, sdp: &'a str) -> Self {
        Self {
            direction: DIRECTION_PUBLISH,
            command: COMMAND_SEND_OFFER,
            stream_info: OfferStreamInfo {
                application_name,
                stream_name,
                session_id: SESSION_ID_PLACEHOLDER,
            },
            sdp: OfferSdp { sdp_type: "offer", sdp },
        }
    }
}

/// Encode a `sendOffer` command as a JSON text frame
pub fn encode_offer(application_name: &str, stream_name: &str, sdp: &str) -> Result<String> {
    serde_json::to_string(&OfferRequest::new(application_name, stream_name, sdp))
        .map_err(|e| SignalingError::MalformedFrame(format!("Failed to encode offer: {}", e)))
}

/// Decode an informational field, mapping a value of the wrong JSON type to `None`
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Leading integer of `s` after optional whitespace and sign ("42abc" is 42)
fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let sign_len = usize::from(s.starts_with(|c: char| c == '+' || c == '-'));
    let end = s[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(s.len(), |i| i + sign_len);
    s[..end].parse().ok()
}

/// SDP object of a response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteSdp {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub sdp_type: Option<String>,
    pub sdp: Option<String>,
}

/// One entry of `iceCandidates`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteCandidate {
    /// Kept as raw JSON; listeners receive its serialized form
    pub candidate: Option<Value>,
    #[serde(rename = "sdpMid", default, deserialize_with = "lenient")]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", default, deserialize_with = "lenient")]
    pub sdp_mline_index: Option<u16>,
}

impl RemoteCandidate {
    /// JSON dump of the `candidate` field, e.g. `"candidate:1 1 UDP ..."` with quotes
    pub fn candidate_json(&self) -> Option<String> {
        self.candidate.as_ref().map(Value::to_string)
    }
}

/// `streamInfo` object of a response
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    #[serde(default, deserialize_with = "lenient")]
    pub application_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub stream_name: Option<String>,
    /// Usually a decimal string, occasionally a bare number
    pub session_id: Option<Value>,
}

impl StreamInfo {
    /// Session id as an integer. Strings yield their leading digits, so
    /// "42abc" is 42 and "abc" is `None`.
    pub fn session_id(&self) -> Option<i64> {
        match self.session_id.as_ref()? {
            Value::String(s) => leading_integer(s),
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }
}

/// Decoded server frame that carried a `status`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalingMessage {
    pub status: i64,
    pub command: Option<String>,
    pub sdp: Option<RemoteSdp>,
    pub ice_candidates: Option<Vec<RemoteCandidate>>,
    pub stream_info: Option<StreamInfo>,
}

impl SignalingMessage {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    pub fn is_fatal(&self) -> bool {
        self.status >= STATUS_FATAL
    }

    /// True if this answers the given outbound command
    pub fn is_response_to(&self, command: &str) -> bool {
        self.command.as_deref() == Some(command)
    }

    /// Answer SDP body, if present and non-empty
    pub fn answer_sdp(&self) -> Option<&str> {
        self.sdp
            .as_ref()
            .and_then(|s| s.sdp.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Server assigned session id, if present and numeric
    pub fn session_id(&self) -> Option<i64> {
        self.stream_info.as_ref().and_then(StreamInfo::session_id)
    }
}

/// Result of decoding one inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Valid JSON without `status` (keep-alives and the like)
    Ignorable,
    Message(SignalingMessage),
}

/// Decode one inbound text frame.
///
/// Non-JSON payloads and frames whose fields have the wrong types are
/// `MalformedFrame`; JSON without a `status` key is [`Inbound::Ignorable`].
pub fn decode_message(payload: &str) -> Result<Inbound> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| SignalingError::MalformedFrame(e.to_string()))?;

    let has_status = value
        .as_object()
        .map_or(false, |obj| obj.contains_key("status"));
    if !has_status {
        debug!("Ignoring frame without status");
        return Ok(Inbound::Ignorable);
    }

    serde_json::from_value(value)
        .map(Inbound::Message)
        .map_err(|e| SignalingError::MalformedFrame(e.to_string()))
}
