use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use quantum_auth::{AuthScheme, Authenticator};
use quantum_components::ComponentCatalog;
use quantum_core::QuantumService;
use quantum_http::router;
use quantum_intents::{CompletionEngine, CompletionError, NextIntentSuggester};
use quantum_store::{AuditStore, InMemoryAuditStore, SqliteAuditStore, StoreError};
use quantum_types::{AuditRow, QuantumRequest};
use serde_json::{json, Value};
use tower::ServiceExt;

const KEY: &str = "test-secret";

fn app_with(
    scheme: AuthScheme,
    suggester: NextIntentSuggester,
    store: Option<Arc<dyn AuditStore>>,
) -> Router {
    let service = QuantumService::new(
        Authenticator::new(KEY, scheme).unwrap(),
        ComponentCatalog::default(),
        suggester,
        store,
    );
    router(Arc::new(service), &[]).unwrap()
}

fn app(store: Option<Arc<dyn AuditStore>>) -> Router {
    app_with(AuthScheme::Bearer, NextIntentSuggester::Static, store)
}

fn post_quantum(auth: Option<(&str, &str)>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/quantum")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some((name, value)) = auth {
        builder = builder.header(name, value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn bearer() -> Option<(&'static str, &'static str)> {
    Some(("authorization", "Bearer test-secret"))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

fn scenario_body() -> Value {
    json!({
        "intent": "refreshSession",
        "userId": 1,
        "cacheKeys": ["userProfile_v2"],
        "requestedComponents": ["profile", "notifications"]
    })
}

#[tokio::test]
async fn root_reports_active() {
    let app = app(None);
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
}

#[tokio::test]
async fn healthz_is_ok() {
    let app = app(None);
    let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
}

#[tokio::test]
async fn refresh_session_scenario() {
    let app = app(None);
    let (status, body) = send(&app, post_quantum(bearer(), scenario_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["components"],
        json!({"notifications": {"messages": ["Welcome back!", "You have 3 new alerts."]}})
    );
    assert_eq!(body["nextIntents"], json!(["refreshSession", "loadUserActivity"]));
    assert!(body["microFunctions"].as_object().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn all_default_components_with_no_cache_keys() {
    let app = app(None);
    let (status, body) = send(
        &app,
        post_quantum(
            bearer(),
            json!({
                "intent": "load",
                "userId": 5,
                "requestedComponents": ["profile", "permissions", "notifications", "unknown"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let keys: Vec<&str> = body["components"]
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, vec!["notifications", "permissions", "profile"]);
    assert_eq!(body["components"]["profile"]["name"], "John Doe");
}

#[tokio::test]
async fn permissions_cache_key_suppresses_permissions() {
    let app = app(None);
    let (status, body) = send(
        &app,
        post_quantum(
            bearer(),
            json!({
                "intent": "load",
                "userId": 2,
                "cacheKeys": ["userPermissions_v1"],
                "requestedComponents": ["permissions", "notifications"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["components"].get("permissions").is_none());
    assert!(body["components"].get("notifications").is_some());
}

#[tokio::test]
async fn missing_credential_is_401() {
    let store = Arc::new(InMemoryAuditStore::new());
    let app = app(Some(store.clone()));
    let (status, body) = send(&app, post_quantum(None, scenario_body())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Missing Authorization header");
    assert_eq!(store.len().await, 0);
}

#[tokio::test]
async fn wrong_credential_is_401_and_not_recorded() {
    let store = Arc::new(InMemoryAuditStore::new());
    let app = app(Some(store.clone()));
    for value in ["Bearer nope", "test-secret", "Basic test-secret"] {
        let (status, _) = send(
            &app,
            post_quantum(Some(("authorization", value)), scenario_body()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "credential {value:?}");
    }
    assert_eq!(store.len().await, 0);
}

#[tokio::test]
async fn header_scheme_reads_api_key_header() {
    let app = app_with(AuthScheme::api_key_header(), NextIntentSuggester::Static, None);
    let (status, _) = send(&app, post_quantum(Some(("X-API-Key", KEY)), scenario_body())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, post_quantum(bearer(), scenario_body())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_body_is_client_error_before_auth() {
    let app = app(None);
    let (status, body) = send(
        &app,
        post_quantum(None, json!({"intent": "x", "userId": "one"})),
    )
    .await;
    assert!(status.is_client_error());
    assert_ne!(status, StatusCode::UNAUTHORIZED);
    assert!(body["detail"].is_string());

    let (status, _) = send(
        &app,
        post_quantum(None, json!({"intent": "x", "userId": 0, "requestedComponents": []})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn history_returns_newest_first() {
    let store: Arc<dyn AuditStore> = Arc::new(SqliteAuditStore::open_in_memory().unwrap());
    let app = app(Some(store));

    for intent in ["first", "second"] {
        let mut body = scenario_body();
        body["intent"] = json!(intent);
        let (status, _) = send(&app, post_quantum(bearer(), body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let req = Request::builder()
        .uri("/quantum/history")
        .header("authorization", "Bearer test-secret")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["history"][0]["intent"], "second");
    assert_eq!(body["history"][0]["cache_keys"], json!(["userProfile_v2"]));
    assert_eq!(body["history"][0]["user_id"], 1);
    assert_eq!(body["history"][1]["intent"], "first");

    let req = Request::builder()
        .uri("/quantum/history?limit=1&offset=1")
        .header("authorization", "Bearer test-secret")
        .body(Body::empty())
        .unwrap();
    let (_, body) = send(&app, req).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["history"][0]["intent"], "first");
}

#[tokio::test]
async fn history_requires_credential() {
    let app = app(Some(Arc::new(InMemoryAuditStore::new())));
    let req = Request::builder()
        .uri("/quantum/history")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn history_not_mounted_without_store() {
    let app = app(None);
    let req = Request::builder()
        .uri("/quantum/history")
        .header("authorization", "Bearer test-secret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = app(None);
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert!(resp.headers().contains_key("x-request-id"));
}

struct Chatty(&'static str);

#[async_trait]
impl CompletionEngine for Chatty {
    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        Ok(self.0.to_string())
    }
}

#[tokio::test]
async fn next_intents_always_two() {
    for reply in ["", "onlyOne", "a, b", "a, b, c, d"] {
        let suggester =
            NextIntentSuggester::completion(Arc::new(Chatty(reply)), Duration::from_millis(200));
        let app = app_with(AuthScheme::Bearer, suggester, None);
        let (status, body) = send(&app, post_quantum(bearer(), scenario_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["nextIntents"].as_array().map(Vec::len),
            Some(2),
            "reply {reply:?}"
        );
    }
}

struct FailingStore;

#[async_trait]
impl AuditStore for FailingStore {
    async fn record(&self, _req: &QuantumRequest) -> Result<i64, StoreError> {
        Err(StoreError {
            message: "database is locked".into(),
        })
    }

    async fn history(&self, _limit: usize, _offset: usize) -> Result<Vec<AuditRow>, StoreError> {
        Err(StoreError {
            message: "database is locked".into(),
        })
    }
}

#[tokio::test]
async fn storage_failure_is_500_with_detail() {
    let app = app(Some(Arc::new(FailingStore)));
    let (status, body) = send(&app, post_quantum(bearer(), scenario_body())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"]
        .as_str()
        .is_some_and(|d| d.contains("database is locked")));

    let req = Request::builder()
        .uri("/quantum/history")
        .header("authorization", "Bearer test-secret")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn history_offset_past_end_is_empty() {
    let store: Arc<dyn AuditStore> = Arc::new(SqliteAuditStore::open_in_memory().unwrap());
    let app = app(Some(store));
    let (status, _) = send(&app, post_quantum(bearer(), scenario_body())).await;
    assert_eq!(status, StatusCode::OK);

    let req = Request::builder()
        .uri("/quantum/history?offset=18446744073709551615")
        .header("authorization", "Bearer test-secret")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}
