//! Receiver channel: application and session management.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;

use castv2_core::protocol::payload::{
    self, AppSession, AvailabilityPayload, ReceiverRequest, ReceiverStatus, StatusPayload, Volume,
    LAUNCH_ERROR_TYPE,
};
use castv2_core::protocol::NS_RECEIVER;
use castv2_core::{CastError, Result};

use crate::transport::Link;

use super::{Controller, RequestResponse};

pub struct Receiver {
    rr: RequestResponse,
}

impl Receiver {
    pub fn new(
        link: Link,
        source_id: impl Into<String>,
        destination_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            rr: RequestResponse::new(
                Controller::new(link, source_id, destination_id, NS_RECEIVER),
                timeout,
            ),
        }
    }

    pub async fn get_status(&self) -> Result<ReceiverStatus> {
        let v = self.rr.request(payload::to_json(&ReceiverRequest::GetStatus)?).await?;
        let resp: StatusPayload = payload::from_json(v)?;
        Ok(resp.status)
    }

    pub async fn get_sessions(&self) -> Result<Vec<AppSession>> {
        Ok(self.get_status().await?.applications)
    }

    pub async fn get_app_availability(&self, app_id: &str) -> Result<BTreeMap<String, String>> {
        let v = self
            .rr
            .request(payload::to_json(&ReceiverRequest::GetAppAvailability {
                app_id: vec![app_id.to_string()],
            })?)
            .await?;
        let resp: AvailabilityPayload = payload::from_json(v)?;
        Ok(resp.availability)
    }

    /// First session running `app_id`, if any. Pure lookup, no I/O.
    pub fn app_session<'a>(app_id: &str, sessions: &'a [AppSession]) -> Option<&'a AppSession> {
        sessions.iter().find(|s| s.app_id == app_id)
    }

    /// Launch `app_id` and return the resulting session. A response without
    /// a matching session (including an explicit LAUNCH_ERROR) is reported,
    /// not swallowed.
    pub async fn launch(&self, app_id: &str) -> Result<AppSession> {
        let v = self
            .rr
            .request(payload::to_json(&ReceiverRequest::Launch {
                app_id: app_id.to_string(),
            })?)
            .await?;

        if v.get("type").and_then(Value::as_str) == Some(LAUNCH_ERROR_TYPE) {
            let reason = v
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("unspecified");
            tracing::warn!(app_id, reason, "launch rejected by receiver");
            return Err(CastError::SessionNotFound(app_id.to_string()));
        }

        let resp: StatusPayload = payload::from_json(v)?;
        Self::app_session(app_id, &resp.status.applications)
            .cloned()
            .ok_or_else(|| CastError::SessionNotFound(app_id.to_string()))
    }

    pub async fn stop(&self, session_id: &str) -> Result<Value> {
        self.rr
            .request(payload::to_json(&ReceiverRequest::Stop {
                session_id: session_id.to_string(),
            })?)
            .await
    }

    pub async fn set_volume(&self, level: f64) -> Result<Value> {
        self.rr
            .request(payload::to_json(&ReceiverRequest::SetVolume {
                volume: Volume { level, muted: None },
            })?)
            .await
    }

    pub async fn get_volume(&self) -> Result<f64> {
        let status = self.get_status().await?;
        status
            .volume
            .map(|v| v.level)
            .ok_or_else(|| CastError::Payload("receiver status has no volume".into()))
    }
}
