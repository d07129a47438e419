//! Request/response correlation.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use castv2_core::protocol::envelope::Envelope;
use castv2_core::{CastError, Result};

use super::Controller;

type Pending = Arc<DashMap<u32, oneshot::Sender<Value>>>;

/// Correlates outbound requests to their responses via an injected
/// `requestId`. Ids are controller-local, start at 1, and are never reused;
/// responses may arrive out of submission order and are matched solely by
/// id. Each pending slot completes at most once.
pub struct RequestResponse {
    ctl: Controller,
    next_id: AtomicU32,
    pending: Pending,
    timeout: Duration,
    dispatch: JoinHandle<()>,
}

impl RequestResponse {
    pub fn new(ctl: Controller, timeout: Duration) -> Self {
        let pending: Pending = Arc::new(DashMap::new());
        let dispatch = tokio::spawn(dispatch_loop(ctl.subscribe(), Arc::clone(&pending)));
        Self {
            ctl,
            next_id: AtomicU32::new(1),
            pending,
            timeout,
            dispatch,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.ctl
    }

    /// Send `payload` with a fresh `requestId` and await the matching
    /// response. On timeout the pending slot is discarded so a late
    /// response is dropped rather than misdelivered. Once the transport is
    /// gone the send itself fails with `Disconnected`; a request already in
    /// flight still resolves at the timeout bound.
    pub async fn request(&self, payload: Value) -> Result<Value> {
        let mut payload = payload;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        match payload {
            Value::Object(ref mut map) => {
                map.insert("requestId".into(), Value::from(id));
            }
            _ => {
                return Err(CastError::Internal(
                    "request payload must be a json object".into(),
                ))
            }
        }

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        if let Err(e) = self.ctl.send(payload).await {
            self.pending.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(_)) => Err(CastError::Disconnected),
            Err(_) => {
                self.pending.remove(&id);
                Err(CastError::Timeout)
            }
        }
    }
}

impl Drop for RequestResponse {
    fn drop(&mut self) {
        self.dispatch.abort();
    }
}

async fn dispatch_loop(mut rx: mpsc::UnboundedReceiver<Envelope>, pending: Pending) {
    while let Some(env) = rx.recv().await {
        // Broadcasts carry requestId 0; they are not responses.
        let Some(id) = env.request_id().filter(|id| *id != 0) else {
            continue;
        };
        match pending.remove(&id) {
            Some((_, tx)) => {
                let _ = tx.send(env.payload);
            }
            None => tracing::debug!(request_id = id, "unmatched response dropped"),
        }
    }
    // Transport gone: dropping every pending sender fails the waiters.
    pending.clear();
}
