use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request},
    routing::{get, post},
    Json, Router,
};
use quantum_core::QuantumService;
use quantum_types::{HistoryPage, QuantumRequest, QuantumResponse};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

mod error;
pub use error::ApiError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const MAX_HISTORY_LIMIT: usize = 100;

#[derive(Clone)]
struct AppState {
    service: Arc<QuantumService>,
    credential_header: HeaderName,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_limit() -> usize {
    10
}

/// Build the API router. `/quantum/history` is mounted only when the service
/// records requests. An empty `cors_origins` allows any origin.
pub fn router(service: Arc<QuantumService>, cors_origins: &[String]) -> anyhow::Result<Router> {
    let credential_header = HeaderName::try_from(service.authenticator().scheme().header_name())?;
    let persistence = service.persistence_enabled();
    let state = AppState {
        service,
        credential_header,
    };

    let mut app = Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/quantum", post(quantum));
    if persistence {
        app = app.route("/quantum/history", get(history));
    }

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    Ok(app
        .with_state(state)
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            let request_id = req
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %req.method(),
                uri = %req.uri(),
                request_id
            )
        }))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(cors_layer(cors_origins)?))
}

fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    if origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}

async fn root() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "active",
        service: "QuantumRequest API",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn healthz() -> &'static str {
    "ok"
}

fn credential<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn quantum(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<QuantumRequest>, JsonRejection>,
) -> Result<Json<QuantumResponse>, ApiError> {
    let Json(req) = body?;
    let resp = state
        .service
        .handle(credential(&headers, &state.credential_header), req)
        .await?;
    Ok(Json(resp))
}

async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<HistoryPage>, ApiError> {
    let Query(params) = params?;
    let limit = params.limit.clamp(1, MAX_HISTORY_LIMIT);
    let page = state
        .service
        .history(
            credential(&headers, &state.credential_header),
            limit,
            params.offset,
        )
        .await?;
    Ok(Json(page))
}

/// `RUST_LOG`-driven subscriber shared by the binaries.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
