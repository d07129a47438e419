//! Typed JSON payload contracts, per namespace.
//!
//! Requests are unions tagged by the protocol's `type` field; responses the
//! engine consumes are validated into the structs below at the controller,
//! instead of being walked field-by-field as untyped JSON. Correlation ids
//! (`requestId`, `mediaSessionId`) are cross-cutting and injected by the
//! request layer after serialization, so they do not appear here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CastError, Result};

/// Serialize a typed payload into the JSON value the envelope carries.
pub fn to_json<T: Serialize>(msg: &T) -> Result<Value> {
    serde_json::to_value(msg).map_err(|e| CastError::Internal(format!("payload encode: {e}")))
}

/// Deserialize a correlated response payload, reporting a payload error on
/// shape mismatch instead of panicking or guessing.
pub fn from_json<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| CastError::Payload(format!("response decode: {e}")))
}

/// Keep-alive channel messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeartbeatCommand {
    Ping,
    Pong,
}

/// Virtual connection channel messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionCommand {
    Connect,
    Close,
}

/// Receiver channel requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiverRequest {
    GetStatus,
    #[serde(rename_all = "camelCase")]
    GetAppAvailability { app_id: Vec<String> },
    #[serde(rename_all = "camelCase")]
    Launch { app_id: String },
    #[serde(rename_all = "camelCase")]
    Stop { session_id: String },
    SetVolume { volume: Volume },
}

/// Media channel requests. Session-scoped variants gain an injected
/// `mediaSessionId` before they hit the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaRequest {
    GetStatus,
    #[serde(rename_all = "camelCase")]
    Load {
        media: MediaInfo,
        autoplay: bool,
        current_time: f64,
        active_track_ids: Vec<i64>,
        repeat_mode: String,
    },
    Play,
    Pause,
    Stop,
    #[serde(rename_all = "camelCase")]
    Seek { current_time: f64 },
    #[serde(rename_all = "camelCase")]
    EditTracksInfo { active_track_ids: Vec<i64> },
}

/// `MEDIA_STATUS` broadcast tag.
pub const MEDIA_STATUS_TYPE: &str = "MEDIA_STATUS";
/// Receiver-channel launch failure tag.
pub const LAUNCH_ERROR_TYPE: &str = "LAUNCH_ERROR";
/// Keep-alive reply tag.
pub const PONG_TYPE: &str = "PONG";

/// `RECEIVER_STATUS` body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatusPayload {
    #[serde(default)]
    pub status: ReceiverStatus,
}

/// Receiver-wide state: the running applications and the device volume.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiverStatus {
    #[serde(default)]
    pub applications: Vec<AppSession>,
    #[serde(default)]
    pub volume: Option<Volume>,
}

/// One remote application instance currently running on the receiver.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSession {
    pub app_id: String,
    pub session_id: String,
    pub transport_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub status_text: Option<String>,
}

/// Device volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub level: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
}

/// `GET_APP_AVAILABILITY` response body. The map is keyed by app id; the
/// firmware reports values like `APP_AVAILABLE` / `APP_UNAVAILABLE`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AvailabilityPayload {
    #[serde(default)]
    pub availability: BTreeMap<String, String>,
}

/// `MEDIA_STATUS` body (both broadcast and correlated responses).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MediaStatusPayload {
    #[serde(default)]
    pub status: Vec<MediaStatus>,
}

/// One media session's playback state.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaStatus {
    pub media_session_id: i64,
    #[serde(default)]
    pub player_state: Option<String>,
    #[serde(default)]
    pub current_time: Option<f64>,
    #[serde(default)]
    pub media: Option<MediaInfo>,
}

/// Media descriptor handed to `LOAD`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    pub content_id: String,
    pub content_type: String,
    pub stream_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Optional `LOAD` parameters with their protocol defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    pub autoplay: bool,
    pub current_time: f64,
    pub active_track_ids: Vec<i64>,
    pub repeat_mode: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            autoplay: false,
            current_time: 0.0,
            active_track_ids: Vec::new(),
            repeat_mode: "REPEAT_OFF".to_string(),
        }
    }
}
