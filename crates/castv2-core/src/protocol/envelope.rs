//! Decoded CASTV2 message.

use serde_json::Value;

use crate::protocol::BROADCAST_ID;

/// One logical protocol message: a namespace-tagged JSON payload with
/// source/destination routing ids. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub source_id: String,
    pub destination_id: String,
    pub namespace: String,
    pub payload: Value,
}

impl Envelope {
    pub fn new(
        source_id: impl Into<String>,
        destination_id: impl Into<String>,
        namespace: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            destination_id: destination_id.into(),
            namespace: namespace.into(),
            payload,
        }
    }

    /// Broadcast envelopes are deliverable to any subscriber regardless of
    /// its own source id.
    pub fn is_broadcast(&self) -> bool {
        self.destination_id == BROADCAST_ID
    }

    /// Exact destination match, or broadcast.
    pub fn addressed_to(&self, id: &str) -> bool {
        self.destination_id == id || self.is_broadcast()
    }

    /// The payload's `type` tag, when present.
    pub fn payload_type(&self) -> Option<&str> {
        self.payload.get("type").and_then(Value::as_str)
    }

    /// The correlation id echoed by request/response payloads.
    pub fn request_id(&self) -> Option<u32> {
        self.payload
            .get("requestId")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    }
}
