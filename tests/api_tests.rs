//! HTTP + push channel integration tests
//!
//! Builds the real route table with fresh instances per test and a mock
//! push channel standing in for a connected WebSocket client, covering
//! the shorten -> push -> acknowledge -> resolve flow end to end.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, test, web};
use parking_lot::Mutex;
use tempfile::TempDir;

use shortpush::config::Config;
use shortpush::delivery::{MAX_RETRIES, RetryEngine};
use shortpush::errors::Result;
use shortpush::ratelimit::{AdmissionGuard, MAX_REQUESTS, RATE_WINDOW};
use shortpush::services::{self, AppStartTime};
use shortpush::storage::UrlStore;
use shortpush::ws::{PushChannel, SessionRegistry, dispatch_inbound};

/// Collects pushed frames instead of writing to a socket.
struct MockChannel {
    sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait::async_trait]
impl PushChannel for MockChannel {
    async fn send_text(&self, text: String) -> Result<()> {
        self.sent.lock().push(text);
        Ok(())
    }
}

struct TestContext {
    store: Arc<UrlStore>,
    engine: Arc<RetryEngine>,
    registry: Arc<SessionRegistry>,
    guard: Arc<AdmissionGuard>,
    config: Config,
    _tmp: TempDir,
}

fn test_context_with_guard(guard: AdmissionGuard) -> TestContext {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let config = Config {
        snapshot_file: tmp
            .path()
            .join("urlMappings.json")
            .to_string_lossy()
            .into_owned(),
        ..Config::default()
    };

    let store = Arc::new(UrlStore::open(&config.snapshot_file));
    // Interval far longer than any test body, so the push counts
    // observed here are first attempts only.
    let engine = Arc::new(RetryEngine::new(
        store.clone(),
        Duration::from_secs(30),
        MAX_RETRIES,
    ));

    TestContext {
        store,
        engine,
        registry: Arc::new(SessionRegistry::new()),
        guard: Arc::new(guard),
        config,
        _tmp: tmp,
    }
}

fn test_context() -> TestContext {
    test_context_with_guard(AdmissionGuard::new(RATE_WINDOW, MAX_REQUESTS))
}

async fn connect_mock_client(ctx: &TestContext) -> (String, Arc<Mutex<Vec<String>>>) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let channel = Arc::new(MockChannel { sent: sent.clone() });
    let client_id = ctx.registry.register(channel).await;
    (client_id, sent)
}

macro_rules! init_app {
    ($ctx:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($ctx.store.clone()))
                .app_data(web::Data::new($ctx.engine.clone()))
                .app_data(web::Data::new($ctx.registry.clone()))
                .app_data(web::Data::new($ctx.guard.clone()))
                .app_data(web::Data::new($ctx.config.clone()))
                .app_data(web::Data::new(AppStartTime {
                    start_datetime: chrono::Utc::now(),
                }))
                .configure(services::routes),
        )
        .await
    };
}

#[actix_rt::test]
async fn handshake_delivers_the_client_identity() {
    let ctx = test_context();
    let (client_id, sent) = connect_mock_client(&ctx).await;

    let frames = sent.lock().clone();
    assert_eq!(frames.len(), 1);
    let handshake: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
    assert_eq!(handshake["type"], "connection");
    assert_eq!(handshake["payload"]["clientId"], client_id.as_str());
    assert!(client_id.starts_with("client-"));
}

#[actix_rt::test]
async fn shorten_without_client_id_is_a_client_error() {
    let ctx = test_context();
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/url")
        .set_json(serde_json::json!({ "url": "https://example.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(
        body["error"].as_str().unwrap().contains("Client ID"),
        "unexpected error body: {}",
        body
    );
    assert!(ctx.store.is_empty());
}

#[actix_rt::test]
async fn shorten_rejects_invalid_urls() {
    let ctx = test_context();
    let (client_id, _sent) = connect_mock_client(&ctx).await;
    let app = init_app!(ctx);

    for bad in ["ftp://example.com", "javascript:alert(1)", ""] {
        let req = test::TestRequest::post()
            .uri("/api/url")
            .insert_header(("x-client-id", client_id.as_str()))
            .set_json(serde_json::json!({ "url": bad }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400, "URL {:?} must be rejected", bad);
    }
    assert!(ctx.store.is_empty());
}

#[actix_rt::test]
async fn shorten_pushes_the_result_and_resolve_round_trips() {
    let ctx = test_context();
    let (client_id, sent) = connect_mock_client(&ctx).await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/url")
        .insert_header(("x-client-id", client_id.as_str()))
        .set_json(serde_json::json!({ "url": "https://example.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 202);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "URL is being processed");

    // Handshake plus the flat result push.
    let frames = sent.lock().clone();
    assert_eq!(frames.len(), 2);
    let result: serde_json::Value = serde_json::from_str(&frames[1]).unwrap();
    let shortened_url = result["shortenedURL"].as_str().expect("flat result push");
    assert!(shortened_url.starts_with(&ctx.config.base_url()));

    let code = shortened_url.rsplit('/').next().unwrap().to_string();
    assert_eq!(code.len(), 10);

    let req = test::TestRequest::get()
        .uri(&format!("/api/{}", code))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["url"], "https://example.com");
}

#[actix_rt::test]
async fn acknowledgment_message_marks_the_mapping_and_keeps_it() {
    let ctx = test_context();
    let (client_id, sent) = connect_mock_client(&ctx).await;
    let app = init_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/url")
        .insert_header(("x-client-id", client_id.as_str()))
        .set_json(serde_json::json!({ "url": "https://example.com" }))
        .to_request();
    test::call_service(&app, req).await;

    let result: serde_json::Value =
        serde_json::from_str(&sent.lock()[1]).expect("result frame");
    let code = result["shortenedURL"]
        .as_str()
        .unwrap()
        .rsplit('/')
        .next()
        .unwrap()
        .to_string();

    let ack = serde_json::json!({
        "type": "acknowledgment",
        "payload": { "shortCode": code },
    })
    .to_string();
    dispatch_inbound(&client_id, &ack, &ctx.store, &ctx.engine).await;

    assert!(ctx.store.get(&code).unwrap().acknowledged);
    // Acknowledgment does not delete the mapping.
    assert_eq!(
        ctx.store.lookup(&code),
        Some("https://example.com".to_string())
    );
}

#[actix_rt::test]
async fn unrecognized_and_malformed_inbound_messages_are_ignored() {
    let ctx = test_context();
    let (client_id, _sent) = connect_mock_client(&ctx).await;

    dispatch_inbound(&client_id, "not json at all", &ctx.store, &ctx.engine).await;
    dispatch_inbound(
        &client_id,
        r#"{"type":"telemetry","payload":{"x":1}}"#,
        &ctx.store,
        &ctx.engine,
    )
    .await;
    dispatch_inbound(
        &client_id,
        r#"{"type":"acknowledgment","payload":{}}"#,
        &ctx.store,
        &ctx.engine,
    )
    .await;
    dispatch_inbound(
        &client_id,
        r#"{"type":"acknowledgment","payload":{"shortCode":"unknowncode"}}"#,
        &ctx.store,
        &ctx.engine,
    )
    .await;

    // Channel is still usable afterwards.
    assert!(ctx.registry.push(&client_id, "{}".to_string()).await);
}

#[actix_rt::test]
async fn push_to_unknown_identity_is_a_noop() {
    let ctx = test_context();
    assert!(!ctx.registry.push("client-0-0", "{}".to_string()).await);
}

#[actix_rt::test]
async fn disconnect_removes_the_identity_only() {
    let ctx = test_context();
    let (client_id, _sent) = connect_mock_client(&ctx).await;
    assert_eq!(ctx.registry.client_count(), 1);

    ctx.registry.unregister(&client_id);
    assert_eq!(ctx.registry.client_count(), 0);
    assert!(!ctx.registry.push(&client_id, "{}".to_string()).await);
}

#[actix_rt::test]
async fn over_limit_requests_get_429_with_retry_after() {
    let ctx = test_context_with_guard(AdmissionGuard::new(RATE_WINDOW, 2));
    let (client_id, _sent) = connect_mock_client(&ctx).await;
    let app = init_app!(ctx);

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/url")
            .insert_header(("x-client-id", client_id.as_str()))
            .set_json(serde_json::json!({ "url": "https://example.com" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 202);
    }

    let req = test::TestRequest::post()
        .uri("/api/url")
        .insert_header(("x-client-id", client_id.as_str()))
        .set_json(serde_json::json!({ "url": "https://example.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 429);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let retry_after = body["retryAfter"].as_u64().expect("numeric retryAfter");
    assert!(retry_after >= 1 && retry_after <= RATE_WINDOW.as_secs());
}

#[actix_rt::test]
async fn resolve_unknown_code_is_not_found() {
    let ctx = test_context();
    let app = init_app!(ctx);

    let req = test::TestRequest::get().uri("/api/zzzzzzzzzz").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "URL not found");
}

#[actix_rt::test]
async fn health_reports_status_and_uptime() {
    let ctx = test_context();
    let app = init_app!(ctx);

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert!(body["uptime"].as_i64().unwrap() >= 0);
    assert!(body["timestamp"].is_string());
}

#[actix_rt::test]
async fn unmatched_routes_return_json_404() {
    let ctx = test_context();
    let app = init_app!(ctx);

    let req = test::TestRequest::get().uri("/nope/nothing").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Not Found");
}
