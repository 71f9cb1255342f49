//! Integration test: serve the webhook router on a free port with fake services and
//! exercise the probes and the signed callback over HTTP.

mod common;

use common::{Content, FakeClassifier, FakeMessaging};
use lib::channels::sign_body;
use lib::gateway::{self, GatewayState};
use lib::pipeline::{Pipeline, INTERIM_MESSAGE};
use std::sync::Arc;
use std::time::Duration;

const SECRET: &str = "test-channel-secret";

fn image_event_body(message_id: &str) -> String {
    format!(
        r#"{{"destination":"U0","events":[{{"type":"message","mode":"active","timestamp":1700000000000,"replyToken":"reply-{id}","source":{{"type":"user","userId":"U123"}},"message":{{"id":"{id}","type":"image","contentProvider":{{"type":"line"}}}}}}]}}"#,
        id = message_id
    )
}

struct Harness {
    base: String,
    state: GatewayState,
    messaging: Arc<FakeMessaging>,
    classifier: Arc<FakeClassifier>,
    client: reqwest::Client,
}

async fn start() -> Harness {
    start_with(FakeClassifier::answering("寶特瓶, 資源回收")).await
}

async fn start_with(classifier: FakeClassifier) -> Harness {
    let messaging = Arc::new(FakeMessaging::with_content(Content::Chunks(vec![
        &b"\xFF\xD8\xFF\xE0"[..],
    ])));
    let classifier = Arc::new(classifier);
    let pipeline = Pipeline::new(messaging.clone(), classifier.clone());
    let state = GatewayState::new(SECRET, pipeline);
    let app = gateway::router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind free port");
    let port = listener.local_addr().expect("local_addr").port();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Harness {
        base: format!("http://127.0.0.1:{}", port),
        state,
        messaging,
        classifier,
        client: reqwest::Client::new(),
    }
}

async fn post_callback(h: &Harness, body: &str, signature: Option<&str>) -> reqwest::Response {
    let mut req = h
        .client
        .post(format!("{}/callback", h.base))
        .header("Content-Type", "application/json")
        .body(body.to_string());
    if let Some(sig) = signature {
        req = req.header("X-Line-Signature", sig);
    }
    req.send().await.expect("send callback")
}

#[tokio::test]
async fn probes_return_static_text() {
    let h = start().await;

    let home = h.client.get(format!("{}/", h.base)).send().await.unwrap();
    assert_eq!(home.status(), 200);
    assert_eq!(home.text().await.unwrap(), "✅ 垃圾分類機器人服務運行中！");

    let test = h.client.get(format!("{}/test", h.base)).send().await.unwrap();
    assert_eq!(test.status(), 200);
    assert_eq!(test.text().await.unwrap(), "🔧 測試頁面 - 服務正常運作中");
}

#[tokio::test]
async fn signed_image_event_is_acknowledged_then_processed() {
    let h = start().await;
    let body = image_event_body("m-42");
    let sig = sign_body(SECRET, body.as_bytes()).unwrap();

    let resp = post_callback(&h, &body, Some(&sig)).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");

    let mut pushes = Vec::new();
    for _ in 0..100 {
        pushes = h.messaging.pushes();
        if !pushes.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(pushes.len(), 1, "final push not observed within 2s");
    assert!(pushes[0].contains("寶特瓶"));
    assert_eq!(h.classifier.calls(), 1);
    assert_eq!(
        h.messaging.sent()[0],
        common::Sent::Reply {
            token: "reply-m-42".to_string(),
            text: INTERIM_MESSAGE.to_string()
        }
    );
}

#[tokio::test]
async fn tampered_body_with_unchanged_signature_is_rejected() {
    let h = start().await;
    let body = image_event_body("m-1");
    let sig = sign_body(SECRET, body.as_bytes()).unwrap();
    let tampered = image_event_body("m-2");

    let resp = post_callback(&h, &tampered, Some(&sig)).await;
    assert_eq!(resp.status(), 400);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.messaging.sent().is_empty());
    assert_eq!(h.classifier.calls(), 0);
}

#[tokio::test]
async fn missing_signature_is_rejected() {
    let h = start().await;
    let resp = post_callback(&h, &image_event_body("m-1"), None).await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn signed_garbage_is_rejected() {
    let h = start().await;
    let body = "not json";
    let sig = sign_body(SECRET, body.as_bytes()).unwrap();
    let resp = post_callback(&h, body, Some(&sig)).await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn verification_ping_without_events_is_acknowledged() {
    let h = start().await;
    let body = r#"{"destination":"U0","events":[]}"#;
    let sig = sign_body(SECRET, body.as_bytes()).unwrap();
    let resp = post_callback(&h, body, Some(&sig)).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn drain_waits_for_in_flight_pipeline_to_push() {
    let mut slow = FakeClassifier::answering("電池, 有害垃圾");
    slow.delay = Duration::from_millis(400);
    let h = start_with(slow).await;
    let body = image_event_body("m-7");
    let sig = sign_body(SECRET, body.as_bytes()).unwrap();

    let resp = post_callback(&h, &body, Some(&sig)).await;
    assert_eq!(resp.status(), 200);
    assert!(h.messaging.pushes().is_empty());

    let aborted = h.state.drain_tasks(Duration::from_secs(5)).await;

    assert_eq!(aborted, 0);
    let pushes = h.messaging.pushes();
    assert_eq!(pushes.len(), 1);
    assert!(pushes[0].contains("電池"));
}

#[tokio::test]
async fn drain_aborts_pipelines_past_the_limit() {
    let mut stuck = FakeClassifier::answering("電池, 有害垃圾");
    stuck.delay = Duration::from_secs(30);
    let h = start_with(stuck).await;
    let body = image_event_body("m-8");
    let sig = sign_body(SECRET, body.as_bytes()).unwrap();

    let resp = post_callback(&h, &body, Some(&sig)).await;
    assert_eq!(resp.status(), 200);

    let aborted = h.state.drain_tasks(Duration::from_millis(200)).await;

    assert_eq!(aborted, 1);
    assert!(h.messaging.pushes().is_empty());
}
