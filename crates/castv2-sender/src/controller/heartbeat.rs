//! Keep-alive channel.

use tokio::task::JoinHandle;

use castv2_core::protocol::payload::{self, HeartbeatCommand, PONG_TYPE};
use castv2_core::protocol::NS_HEARTBEAT;
use castv2_core::Result;

use crate::transport::Link;

use super::Controller;

/// Sends PINGs on a fixed cadence (driven by the platform's keep-alive
/// timer) and observes PONGs. A missed PONG triggers no failure action;
/// liveness policy stays with the caller.
#[derive(Clone)]
pub struct Heartbeat {
    ctl: Controller,
}

impl Heartbeat {
    pub fn new(
        link: Link,
        source_id: impl Into<String>,
        destination_id: impl Into<String>,
    ) -> Self {
        Self {
            ctl: Controller::new(link, source_id, destination_id, NS_HEARTBEAT),
        }
    }

    pub async fn ping(&self) -> Result<()> {
        self.ctl.send(payload::to_json(&HeartbeatCommand::Ping)?).await
    }

    /// Spawn the PONG observer. Replies are only logged.
    pub fn observe(&self) -> JoinHandle<()> {
        let mut rx = self.ctl.subscribe();
        tokio::spawn(async move {
            while let Some(env) = rx.recv().await {
                if env.payload_type() == Some(PONG_TYPE) {
                    tracing::trace!("pong");
                }
            }
        })
    }
}
