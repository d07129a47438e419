//! Media session resolution semantics.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod support;

use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;

use castv2_core::protocol::envelope::Envelope;
use castv2_core::protocol::NS_MEDIA;
use castv2_core::CastError;
use castv2_sender::controller::Media;

use support::{fake_wire, FakeWire};

#[tokio::test]
async fn unknown_session_probes_status_once_then_fails_without_sending() {
    let FakeWire {
        link,
        mut outbound,
        router,
    } = fake_wire();
    let media = Media::new(link, "client-1", "t-1", Duration::from_secs(1));

    let responder = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(env) = outbound.recv().await {
            if env.payload_type() == Some("GET_STATUS") {
                let id = env.request_id().unwrap();
                // Status probe resolves, but reports no running session.
                router.publish(&Envelope::new(
                    "t-1",
                    &env.source_id,
                    NS_MEDIA,
                    json!({"type": "MEDIA_STATUS", "requestId": id, "status": []}),
                ));
            }
            seen.push(env.payload_type().unwrap().to_string());
        }
        seen
    });

    let err = media.play().await.unwrap_err();
    assert!(matches!(err, CastError::NoCurrentSession), "{err}");

    // Exactly one status probe went out, and the PLAY itself never did.
    drop(media);
    let seen = responder.await.unwrap();
    assert_eq!(seen, vec!["GET_STATUS"]);
}

#[tokio::test]
async fn broadcast_media_status_enables_direct_session_requests() {
    let FakeWire {
        link,
        mut outbound,
        router,
    } = fake_wire();
    let media = Media::new(link, "client-1", "t-1", Duration::from_secs(1));

    // Unsolicited broadcast: any subscriber may pick it up.
    router.publish(&Envelope::new(
        "t-1",
        "*",
        NS_MEDIA,
        json!({
            "type": "MEDIA_STATUS",
            "requestId": 0,
            "status": [{"mediaSessionId": 7, "playerState": "PLAYING"}]
        }),
    ));

    timeout(Duration::from_secs(1), async {
        while media.current_session().await.is_none() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(media.current_session().await.unwrap().media_session_id, 7);

    let responder = tokio::spawn(async move {
        let env = outbound.recv().await.unwrap();
        // No status probe: the broadcast already resolved the session.
        assert_eq!(env.payload_type(), Some("PAUSE"));
        assert_eq!(env.payload["mediaSessionId"], 7);
        let id = env.request_id().unwrap();
        router.publish(&Envelope::new(
            "t-1",
            &env.source_id,
            NS_MEDIA,
            json!({
                "type": "MEDIA_STATUS",
                "requestId": id,
                "status": [{"mediaSessionId": 7, "playerState": "PAUSED"}]
            }),
        ));
    });

    let v = media.pause().await.unwrap();
    assert_eq!(v["status"][0]["playerState"], "PAUSED");
    responder.await.unwrap();
}

#[tokio::test]
async fn empty_status_response_clears_current_session() {
    let FakeWire {
        link,
        mut outbound,
        router,
    } = fake_wire();
    let media = Media::new(link, "client-1", "t-1", Duration::from_secs(1));

    router.publish(&Envelope::new(
        "t-1",
        "*",
        NS_MEDIA,
        json!({
            "type": "MEDIA_STATUS",
            "requestId": 0,
            "status": [{"mediaSessionId": 7, "playerState": "PLAYING"}]
        }),
    ));
    timeout(Duration::from_secs(1), async {
        while media.current_session().await.is_none() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    // The device now reports no running session at all.
    let responder = tokio::spawn(async move {
        while let Some(env) = outbound.recv().await {
            assert_eq!(env.payload_type(), Some("GET_STATUS"));
            let id = env.request_id().unwrap();
            router.publish(&Envelope::new(
                "t-1",
                &env.source_id,
                NS_MEDIA,
                json!({"type": "MEDIA_STATUS", "requestId": id, "status": []}),
            ));
        }
    });

    let status = media.get_status().await.unwrap();
    assert!(status.is_empty());
    assert!(media.current_session().await.is_none());

    // Playback re-probes instead of reusing the dead session id.
    let err = media.pause().await.unwrap_err();
    assert!(matches!(err, CastError::NoCurrentSession), "{err}");

    drop(media);
    responder.await.unwrap();
}

#[tokio::test]
async fn empty_broadcast_clears_current_session() {
    let FakeWire { link, router, .. } = fake_wire();
    let media = Media::new(link, "client-1", "t-1", Duration::from_secs(1));

    router.publish(&Envelope::new(
        "t-1",
        "*",
        NS_MEDIA,
        json!({
            "type": "MEDIA_STATUS",
            "requestId": 0,
            "status": [{"mediaSessionId": 7, "playerState": "PLAYING"}]
        }),
    ));
    timeout(Duration::from_secs(1), async {
        while media.current_session().await.is_none() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    router.publish(&Envelope::new(
        "t-1",
        "*",
        NS_MEDIA,
        json!({"type": "MEDIA_STATUS", "requestId": 0, "status": []}),
    ));
    timeout(Duration::from_secs(1), async {
        while media.current_session().await.is_some() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn get_status_response_updates_current_session() {
    let FakeWire {
        link,
        mut outbound,
        router,
    } = fake_wire();
    let media = Media::new(link, "client-1", "t-1", Duration::from_secs(1));

    let responder = tokio::spawn(async move {
        let env = outbound.recv().await.unwrap();
        assert_eq!(env.payload_type(), Some("GET_STATUS"));
        let id = env.request_id().unwrap();
        router.publish(&Envelope::new(
            "t-1",
            &env.source_id,
            NS_MEDIA,
            json!({
                "type": "MEDIA_STATUS",
                "requestId": id,
                "status": [{"mediaSessionId": 3, "currentTime": 12.5}]
            }),
        ));
    });

    let status = media.get_status().await.unwrap();
    assert_eq!(status.len(), 1);
    assert_eq!(media.current_session().await.unwrap().media_session_id, 3);
    responder.await.unwrap();
}
