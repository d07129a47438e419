//! Controller hierarchy: protocol participants bound to one
//! (source id, destination id, namespace) triple.

pub mod connection;
pub mod heartbeat;
pub mod media;
pub mod receiver;
pub mod request;

pub use connection::Connection;
pub use heartbeat::Heartbeat;
pub use media::Media;
pub use receiver::Receiver;
pub use request::RequestResponse;

use serde_json::Value;
use tokio::sync::mpsc;

use castv2_core::protocol::envelope::Envelope;
use castv2_core::Result;

use crate::transport::Link;

/// Base controller. Stateless beyond its routing triple; everything it
/// sends is wrapped into an envelope on the bound namespace, and its
/// subscription only delivers envelopes addressed to it (exact destination
/// match on its own source id, or broadcast).
#[derive(Clone)]
pub struct Controller {
    link: Link,
    source_id: String,
    destination_id: String,
    namespace: String,
}

impl Controller {
    pub fn new(
        link: Link,
        source_id: impl Into<String>,
        destination_id: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            link,
            source_id: source_id.into(),
            destination_id: destination_id.into(),
            namespace: namespace.into(),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Wrap `payload` in an envelope and queue it for the wire.
    pub async fn send(&self, payload: Value) -> Result<()> {
        self.link
            .send(Envelope::new(
                self.source_id.clone(),
                self.destination_id.clone(),
                self.namespace.clone(),
                payload,
            ))
            .await
    }

    /// Subscribe to the bound namespace, filtered to envelopes addressed to
    /// this controller. The filter runs in its own task so router delivery
    /// never blocks on a consumer.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Envelope> {
        let mut raw = self.link.subscribe(&self.namespace);
        let (tx, rx) = mpsc::unbounded_channel();
        let me = self.source_id.clone();
        tokio::spawn(async move {
            while let Some(env) = raw.recv().await {
                if !env.addressed_to(&me) {
                    continue;
                }
                if tx.send(env).is_err() {
                    break;
                }
            }
        });
        rx
    }
}
