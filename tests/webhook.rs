use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use secrecy::SecretString;
use tower::ServiceExt;

use lineagent::agent::{AgentRuntime, Router};
use lineagent::config::AgentKind;
use lineagent::gateway::{build_router, AppState, Dispatcher, FALLBACK_REPLY};
use lineagent::line::{Messenger, SignatureVerifier, SIGNATURE_HEADER};
use lineagent::{Error, Result};

const SECRET: &str = "test-channel-secret";

/// Echoes the input, failing for any message containing "boom"
#[derive(Default)]
struct EchoRuntime {
    calls: AtomicUsize,
}

#[async_trait]
impl AgentRuntime for EchoRuntime {
    async fn run(&self, _agent: AgentKind, _user_id: &str, input: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if input.contains("boom") {
            return Err(Error::Llm("quota exceeded".into()));
        }
        Ok(format!("echo: {}", input))
    }
}

#[derive(Default)]
struct RecordingMessenger {
    replies: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
        self.replies.lock().unwrap().push((reply_token.to_string(), text.to_string()));
        Ok(())
    }
}

struct Harness {
    runtime: Arc<EchoRuntime>,
    messenger: Arc<RecordingMessenger>,
    app: axum::Router,
}

fn harness() -> Harness {
    let runtime = Arc::new(EchoRuntime::default());
    let messenger = Arc::new(RecordingMessenger::default());
    let state = Arc::new(AppState {
        verifier: SignatureVerifier::new(SecretString::from(SECRET)),
        dispatcher: Dispatcher::new(
            runtime.clone(),
            messenger.clone(),
            Router::default(),
            Duration::from_secs(5),
        ),
    });
    Harness {
        runtime,
        messenger,
        app: build_router(state),
    }
}

fn text_event(token: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "message",
        "replyToken": token,
        "source": {"type": "user", "userId": "U4af4980629"},
        "message": {"type": "text", "id": format!("id-{}", token), "text": text}
    })
}

fn sticker_event(token: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "message",
        "replyToken": token,
        "source": {"type": "user", "userId": "U4af4980629"},
        "message": {"type": "sticker", "id": "s1", "packageId": "446", "stickerId": "1988"}
    })
}

fn body_of(events: Vec<serde_json::Value>) -> String {
    serde_json::json!({"destination": "Ubot", "events": events}).to_string()
}

fn signed_request(path: &str, body: &str) -> Request<Body> {
    let signature = SignatureVerifier::new(SecretString::from(SECRET))
        .sign(body.as_bytes())
        .unwrap();
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_valid_request_replies_ok() {
    let h = harness();
    let body = body_of(vec![text_event("r1", "hello")]);

    let response = h.app.oneshot(signed_request("/callback", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
    assert_eq!(
        *h.messenger.replies.lock().unwrap(),
        vec![("r1".to_string(), "echo: hello".to_string())]
    );
}

#[tokio::test]
async fn test_invalid_signature_runs_nothing() {
    let h = harness();
    let body = body_of(vec![text_event("r1", "hello")]);
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header(SIGNATURE_HEADER, "bm90LXRoZS1yaWdodC1zaWduYXR1cmU=")
        .body(Body::from(body))
        .unwrap();

    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(h.runtime.calls.load(Ordering::SeqCst), 0);
    assert!(h.messenger.replies.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_signature_is_unauthorized() {
    let h = harness();
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .body(Body::from(body_of(vec![text_event("r1", "hello")])))
        .unwrap();

    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(h.runtime.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_payload_is_bad_request() {
    let h = harness();
    let response = h.app.oneshot(signed_request("/", "{\"events\": [")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.runtime.calls.load(Ordering::SeqCst), 0);
    assert!(h.messenger.replies.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_event_gets_fallback_in_order() {
    let h = harness();
    let body = body_of(vec![
        text_event("r1", "first"),
        text_event("r2", "boom"),
        text_event("r3", "third"),
    ]);

    let response = h.app.oneshot(signed_request("/", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.runtime.calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        *h.messenger.replies.lock().unwrap(),
        vec![
            ("r1".to_string(), "echo: first".to_string()),
            ("r2".to_string(), FALLBACK_REPLY.to_string()),
            ("r3".to_string(), "echo: third".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_non_text_events_are_skipped() {
    let h = harness();
    let body = body_of(vec![sticker_event("r1"), text_event("r2", "hi")]);

    let response = h.app.oneshot(signed_request("/", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.runtime.calls.load(Ordering::SeqCst), 1);
    let replies = h.messenger.replies.lock().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].0, "r2");
}

#[tokio::test]
async fn test_empty_event_list() {
    let h = harness();
    let response = h.app.oneshot(signed_request("/", &body_of(vec![]))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.runtime.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_health() {
    let h = harness();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "healthy");
}
