//! REST API Handlers
//!
//! HTTP entry point for deployment sync events and read access to the pod
//! cache for status reporting.

use crate::domain::ports::PodStatusSummary;
use crate::error::{Error, ErrorCategory};
use crate::gateway::{Event, SyncHandler};
use crate::watch::PodCache;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

// =============================================================================
// Response Types
// =============================================================================

/// Pod list response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodListResponse {
    pub count: usize,
    pub pods: Vec<PodStatusSummary>,
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
    pub retryable: bool,
}

impl From<&Error> for ApiErrorResponse {
    fn from(err: &Error) -> Self {
        Self {
            error: err.category().to_string(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

fn error_status(err: &Error) -> StatusCode {
    match err.category() {
        ErrorCategory::Config => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCategory::ClusterTransport | ErrorCategory::Gateway => StatusCode::BAD_GATEWAY,
        ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &Error) -> Response {
    (error_status(err), Json(ApiErrorResponse::from(err))).into_response()
}

// =============================================================================
// REST Router
// =============================================================================

/// REST API router builder
pub struct RestRouter {
    handler: Arc<SyncHandler>,
    cache: Arc<PodCache>,
}

impl RestRouter {
    /// Create a new REST router
    pub fn new(handler: Arc<SyncHandler>, cache: Arc<PodCache>) -> Self {
        Self { handler, cache }
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        let state = AppState {
            handler: self.handler,
            cache: self.cache,
        };

        Router::new()
            // Inbound events
            .route("/v1/events", post(handle_event))
            // Pod cache
            .route("/v1/pods", get(list_pods))
            .route("/v1/pods/:name", get(get_pod))
            // Health endpoints
            .route("/health", get(health_check))
            .route("/ready", get(readiness_check))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    handler: Arc<SyncHandler>,
    cache: Arc<PodCache>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle a deployment sync event; the body is the reply, if any.
///
/// The sync runs on its own task so a dropped connection cannot abort a
/// reconciliation between creates.
async fn handle_event(State(state): State<AppState>, Json(event): Json<Event>) -> Response {
    info!("Received event {} ({})", event.id, event.name);

    let event_id = event.id.clone();
    let handler = state.handler.clone();
    let sync = tokio::spawn(async move { handler.handle(&event).await });

    match sync.await {
        Ok(Ok(Some(publish))) => (StatusCode::OK, Json(publish)).into_response(),
        Ok(Ok(None)) => StatusCode::NO_CONTENT.into_response(),
        Ok(Err(e)) => {
            error!("Event {} failed: {}", event_id, e);
            error_response(&e)
        }
        Err(e) => {
            error!("Event {} sync task failed: {}", event_id, e);
            error_response(&Error::Internal(format!("sync task failed: {}", e)))
        }
    }
}

/// List all owned pods
async fn list_pods(State(state): State<AppState>) -> impl IntoResponse {
    let pods: Vec<PodStatusSummary> = state.cache.list().iter().map(|r| r.summary()).collect();
    Json(PodListResponse {
        count: pods.len(),
        pods,
    })
}

/// Get one owned pod by name
async fn get_pod(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.cache.get(&name) {
        Some(record) => Json(record.summary()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiErrorResponse {
                error: "not_found".into(),
                message: format!("Pod not found: {}", name),
                retryable: false,
            }),
        )
            .into_response(),
    }
}

async fn health_check() -> impl IntoResponse {
    "ok"
}

async fn readiness_check() -> impl IntoResponse {
    "ok"
}
