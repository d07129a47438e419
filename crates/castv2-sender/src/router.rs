//! Per-namespace publish/subscribe fan-out.

use dashmap::DashMap;
use tokio::sync::mpsc;

use castv2_core::protocol::envelope::Envelope;

/// Demultiplexes inbound envelopes by namespace. The router only looks at
/// the namespace; destination filtering is the subscribing controller's
/// job. Multiple subscribers per namespace all receive every envelope, in
/// arrival order.
#[derive(Default)]
pub struct Router {
    channels: DashMap<String, Vec<mpsc::UnboundedSender<Envelope>>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Register a subscriber for one namespace. The channel is unbounded so
    /// a slow subscriber can never stall frame decoding for other
    /// namespaces.
    pub fn subscribe(&self, namespace: &str) -> mpsc::UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels.entry(namespace.to_string()).or_default().push(tx);
        rx
    }

    /// Deliver to every live subscriber of the envelope's namespace,
    /// pruning dropped ones as we go.
    pub fn publish(&self, env: &Envelope) {
        let Some(mut subs) = self.channels.get_mut(&env.namespace) else {
            tracing::trace!(namespace = %env.namespace, "no subscribers, envelope dropped");
            return;
        };
        subs.retain(|tx| tx.send(env.clone()).is_ok());
    }

    /// Live subscriber count for one namespace.
    pub fn subscriber_count(&self, namespace: &str) -> usize {
        self.channels.get(namespace).map(|s| s.len()).unwrap_or(0)
    }
}
