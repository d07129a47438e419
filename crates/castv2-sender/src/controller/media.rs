//! Media channel: playback control for one remote application.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use castv2_core::protocol::payload::{
    self, LoadOptions, MediaInfo, MediaRequest, MediaStatus, MediaStatusPayload, MEDIA_STATUS_TYPE,
};
use castv2_core::protocol::NS_MEDIA;
use castv2_core::{CastError, Result};

use crate::transport::Link;

use super::{Controller, RequestResponse};

/// Media controller. Tracks the last known media session two ways: any
/// broadcast MEDIA_STATUS observed by the permanent listener, and every
/// explicit GET_STATUS/LOAD response. A status report with no entries
/// clears the tracked session; the next session-scoped request re-probes
/// instead of reusing a dead id.
pub struct Media {
    rr: RequestResponse,
    current: Arc<Mutex<Option<MediaStatus>>>,
    observer: JoinHandle<()>,
}

impl Media {
    pub fn new(
        link: Link,
        source_id: impl Into<String>,
        destination_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let ctl = Controller::new(link, source_id, destination_id, NS_MEDIA);
        let current: Arc<Mutex<Option<MediaStatus>>> = Arc::new(Mutex::new(None));

        let mut rx = ctl.subscribe();
        let tracked = Arc::clone(&current);
        let observer = tokio::spawn(async move {
            while let Some(env) = rx.recv().await {
                if !env.is_broadcast() || env.payload_type() != Some(MEDIA_STATUS_TYPE) {
                    continue;
                }
                match serde_json::from_value::<MediaStatusPayload>(env.payload) {
                    Ok(p) => {
                        let next = p.status.into_iter().next();
                        match &next {
                            Some(s) => tracing::trace!(
                                media_session_id = s.media_session_id,
                                "media status broadcast"
                            ),
                            None => tracing::trace!("media status broadcast, session ended"),
                        }
                        *tracked.lock().await = next;
                    }
                    Err(e) => tracing::debug!(error = %e, "unparsable media status broadcast"),
                }
            }
        });

        Self {
            rr: RequestResponse::new(ctl, timeout),
            current,
            observer,
        }
    }

    /// Last media session seen on this channel, if any.
    pub async fn current_session(&self) -> Option<MediaStatus> {
        self.current.lock().await.clone()
    }

    pub async fn get_status(&self) -> Result<Vec<MediaStatus>> {
        let v = self.rr.request(payload::to_json(&MediaRequest::GetStatus)?).await?;
        let p: MediaStatusPayload = payload::from_json(v)?;
        // Unconditional: an empty report means the session is gone.
        *self.current.lock().await = p.status.first().cloned();
        Ok(p.status)
    }

    /// Load a media item. Succeeds only when the response's first status
    /// entry actually carries a media descriptor; anything else is reported
    /// instead of leaving the caller waiting.
    pub async fn load(&self, media: MediaInfo, options: LoadOptions) -> Result<Vec<MediaStatus>> {
        let content_id = media.content_id.clone();
        let req = MediaRequest::Load {
            media,
            autoplay: options.autoplay,
            current_time: options.current_time,
            active_track_ids: options.active_track_ids,
            repeat_mode: options.repeat_mode,
        };
        let v = self.rr.request(payload::to_json(&req)?).await?;
        let p: MediaStatusPayload = payload::from_json(v)?;
        match p.status.first() {
            Some(first) if first.media.is_some() => {
                *self.current.lock().await = Some(first.clone());
                Ok(p.status)
            }
            _ => Err(CastError::SessionNotFound(content_id)),
        }
    }

    pub async fn play(&self) -> Result<Value> {
        self.session_request(payload::to_json(&MediaRequest::Play)?).await
    }

    pub async fn pause(&self) -> Result<Value> {
        self.session_request(payload::to_json(&MediaRequest::Pause)?).await
    }

    pub async fn stop(&self) -> Result<Value> {
        self.session_request(payload::to_json(&MediaRequest::Stop)?).await
    }

    pub async fn seek(&self, current_time: f64) -> Result<Value> {
        self.session_request(payload::to_json(&MediaRequest::Seek { current_time })?)
            .await
    }

    pub async fn edit_tracks_info(&self, active_track_ids: Vec<i64>) -> Result<Value> {
        self.session_request(payload::to_json(&MediaRequest::EditTracksInfo {
            active_track_ids,
        })?)
        .await
    }

    /// Session-scoped request. If no session is known, probe status exactly
    /// once; if that does not resolve one, fail with `NoCurrentSession`
    /// rather than guessing an id.
    async fn session_request(&self, payload: Value) -> Result<Value> {
        let known = self.current.lock().await.as_ref().map(|s| s.media_session_id);
        let id = match known {
            Some(id) => id,
            None => {
                self.get_status().await?;
                self.current
                    .lock()
                    .await
                    .as_ref()
                    .map(|s| s.media_session_id)
                    .ok_or(CastError::NoCurrentSession)?
            }
        };

        let mut payload = payload;
        match payload {
            Value::Object(ref mut map) => {
                map.insert("mediaSessionId".into(), Value::from(id));
            }
            _ => {
                return Err(CastError::Internal(
                    "session request payload must be a json object".into(),
                ))
            }
        }
        self.rr.request(payload).await
    }
}

impl Drop for Media {
    fn drop(&mut self) {
        self.observer.abort();
    }
}
