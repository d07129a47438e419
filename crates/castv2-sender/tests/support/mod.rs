//! Fake device plumbing shared by the engine tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use castv2_core::protocol::envelope::Envelope;
use castv2_core::protocol::{NS_MEDIA, NS_RECEIVER};
use castv2_sender::router::Router;
use castv2_sender::transport::Link;

/// A link whose outbound side lands in a test-held channel instead of a
/// socket, plus the router used to inject inbound envelopes.
pub struct FakeWire {
    pub link: Link,
    pub outbound: mpsc::Receiver<Envelope>,
    pub router: Arc<Router>,
}

pub fn fake_wire() -> FakeWire {
    let router = Arc::new(Router::new());
    let (tx, rx) = mpsc::channel(64);
    FakeWire {
        link: Link::new(tx, Arc::clone(&router)),
        outbound: rx,
        router,
    }
}

/// Scripted receiver device: answers status/launch/load requests the way a
/// real device would, and logs everything the engine sent.
pub struct ScriptedDevice {
    pub log: Arc<Mutex<Vec<Envelope>>>,
    pub handle: JoinHandle<()>,
}

pub fn spawn_device(
    mut outbound: mpsc::Receiver<Envelope>,
    router: Arc<Router>,
    initial_apps: Vec<Value>,
) -> ScriptedDevice {
    let log: Arc<Mutex<Vec<Envelope>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&log);
    let handle = tokio::spawn(async move {
        let mut apps = initial_apps;
        while let Some(env) = outbound.recv().await {
            seen.lock().unwrap().push(env.clone());
            let reply_to = env.source_id.clone();
            match (env.namespace.as_str(), env.payload_type()) {
                (NS_RECEIVER, Some("GET_STATUS")) => {
                    let id = env.request_id().unwrap();
                    router.publish(&Envelope::new(
                        "receiver-0",
                        &reply_to,
                        NS_RECEIVER,
                        json!({
                            "type": "RECEIVER_STATUS",
                            "requestId": id,
                            "status": {"applications": apps, "volume": {"level": 0.5}}
                        }),
                    ));
                }
                (NS_RECEIVER, Some("LAUNCH")) => {
                    let id = env.request_id().unwrap();
                    let app_id = env.payload["appId"].as_str().unwrap().to_string();
                    apps.push(json!({
                        "appId": app_id,
                        "sessionId": "s-1",
                        "transportId": "t-1",
                        "displayName": "Default Media Receiver"
                    }));
                    router.publish(&Envelope::new(
                        "receiver-0",
                        &reply_to,
                        NS_RECEIVER,
                        json!({
                            "type": "RECEIVER_STATUS",
                            "requestId": id,
                            "status": {"applications": apps, "volume": {"level": 0.5}}
                        }),
                    ));
                }
                (NS_RECEIVER, Some("STOP")) => {
                    let id = env.request_id().unwrap();
                    apps.clear();
                    router.publish(&Envelope::new(
                        "receiver-0",
                        &reply_to,
                        NS_RECEIVER,
                        json!({
                            "type": "RECEIVER_STATUS",
                            "requestId": id,
                            "status": {"applications": [], "volume": {"level": 0.5}}
                        }),
                    ));
                }
                (NS_MEDIA, Some("LOAD")) => {
                    let id = env.request_id().unwrap();
                    let media = env.payload["media"].clone();
                    router.publish(&Envelope::new(
                        "t-1",
                        &reply_to,
                        NS_MEDIA,
                        json!({
                            "type": "MEDIA_STATUS",
                            "requestId": id,
                            "status": [{
                                "mediaSessionId": 1,
                                "playerState": "BUFFERING",
                                "media": media
                            }]
                        }),
                    ));
                }
                (NS_MEDIA, Some("GET_STATUS")) => {
                    let id = env.request_id().unwrap();
                    router.publish(&Envelope::new(
                        "t-1",
                        &reply_to,
                        NS_MEDIA,
                        json!({"type": "MEDIA_STATUS", "requestId": id, "status": []}),
                    ));
                }
                // Heartbeat and connection traffic needs no reply here.
                _ => {}
            }
        }
    });
    ScriptedDevice { log, handle }
}

impl ScriptedDevice {
    /// Envelopes sent so far whose payload `type` matches.
    pub fn sent_of_type(&self, ty: &str) -> Vec<Envelope> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.payload_type() == Some(ty))
            .cloned()
            .collect()
    }

    /// Poll the log until `pred` holds or the bound expires.
    pub async fn wait_until(&self, pred: impl Fn(&[Envelope]) -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            if pred(&self.log.lock().unwrap()) {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition not reached before deadline"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
