//! HTTP API
//!
//! REST endpoints:
//! - /health, / (any method) - Liveness and resident index
//! - GET /create-index - Build and upload the corpus index
//! - POST /query - Multi-fact retrieval

use crate::aggregate::{FactQueries, GroupResult};
use crate::config::ApiConfig;
use crate::defaults::{CORRELATION_ID_HEADER, SERVICE_NAME};
use crate::engine::{EngineHealth, RetrievalEngine};
use crate::error::RetrievalError;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

/// API state
pub struct ApiState {
    pub engine: Arc<RetrievalEngine>,
}

/// Build the application router
pub fn router(engine: Arc<RetrievalEngine>, cors_origins: &[String]) -> Router {
    let state = Arc::new(ApiState { engine });

    Router::new()
        .route("/", any(health))
        .route("/health", any(health))
        .route("/create-index", get(create_index).fallback(not_found))
        .route("/query", post(query).fallback(not_found))
        .fallback(not_found)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Allow-list CORS with credentials
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(CORRELATION_ID_HEADER),
        ])
        .allow_credentials(true)
}

/// Serve the API until Ctrl-C or SIGTERM
pub async fn serve(engine: Arc<RetrievalEngine>, config: ApiConfig) -> anyhow::Result<()> {
    let app = router(engine, &config.cors_origins);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Correlation id from the request, or a fresh one
fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Health check
async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        timestamp: chrono::Utc::now(),
        engine: state.engine.health(),
    })
}

/// Build the corpus index and upload it
async fn create_index(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<crate::corpus::BuildReport>, ApiError> {
    let span = tracing::info_span!("create_index", cid = %correlation_id(&headers));

    async move {
        let start = Instant::now();
        let report = state.engine.create_index().await?;
        tracing::info!(
            index = %report.index,
            vectors = report.vectors,
            latency_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Index created"
        );
        Ok::<_, ApiError>(Json(report))
    }
    .instrument(span)
    .await
}

/// Multi-fact retrieval
async fn query(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<BTreeMap<String, GroupResult>>, ApiError> {
    let span = tracing::info_span!("query", cid = %correlation_id(&headers));

    async move {
        let request: QueryRequest = serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {}", e)))?;

        let top_k = match request.top_k {
            Some(k) if k < 1 => {
                return Err(ApiError::BadRequest("top_k must be at least 1".into()));
            }
            Some(k) => Some(k as usize),
            None => None,
        };

        let facts = request.queries.into_vec();
        let start = Instant::now();
        let results = state
            .engine
            .query(&facts, top_k, request.force_reload)
            .await?;

        tracing::info!(
            facts = facts.len(),
            indexes = results.len(),
            latency_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Query handled"
        );
        Ok::<_, ApiError>(Json(results))
    }
    .instrument(span)
    .await
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

// ============================================================================
// REQUEST/RESPONSE TYPES
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    engine: EngineHealth,
}

/// One fact or a list of facts
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<FactQueries>),
    One(FactQueries),
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl OneOrMany {
    fn into_vec(self) -> Vec<FactQueries> {
        match self {
            OneOrMany::Many(v) => v,
            OneOrMany::One(f) => vec![f],
        }
    }
}

#[derive(Deserialize)]
struct QueryRequest {
    #[serde(default)]
    queries: OneOrMany,
    top_k: Option<i64>,
    #[serde(default)]
    force_reload: bool,
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound,
    Internal(String),
}

impl From<RetrievalError> for ApiError {
    fn from(e: RetrievalError) -> Self {
        match e {
            RetrievalError::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
