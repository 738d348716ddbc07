//! HTTP route handlers for the community agent API.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::memory::core::errors::MemoryError;
use crate::memory::engine::{RetrieveMemoryRequest, RetrieveMemoryResponse, StoreMemoryRequest};
use crate::memory::store::{MemoryStats, StoreOutcome};
use crate::pipeline::error::PipelineError;
use crate::pipeline::orchestrator::ProcessedAnswer;
use crate::pipeline::question::Question;

use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/questions", post(ask_question))
        .route("/api/memory", post(store_memory).delete(clear_memory))
        .route("/api/memory/search", post(search_memory))
        .route("/api/memory/stats", get(memory_stats))
        .with_state(state)
}

/// JSON error body with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<MemoryError> for ApiError {
    fn from(err: MemoryError) -> Self {
        let status = if err.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            e if e.is_validation() => StatusCode::BAD_REQUEST,
            PipelineError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

/// Health check endpoint.
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "community-agent",
        "version": env!("CARGO_PKG_VERSION"),
        "sources": state.pipeline.source_names(),
    }))
}

/// Question request.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    /// Conversation session.
    #[serde(default)]
    pub session_id: String,
    /// Asking user.
    #[serde(default)]
    pub user_id: Option<String>,
    /// The question.
    pub question: Question,
}

/// Handle question requests.
async fn ask_question(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<ProcessedAnswer>, ApiError> {
    let cancel = state.shutdown.child_token();
    let answer = state
        .pipeline
        .process_question(&request.session_id, request.user_id.as_deref(), &request.question, &cancel)
        .await?;
    Ok(Json(answer))
}

/// Handle memory store requests.
async fn store_memory(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StoreMemoryRequest>,
) -> Result<(StatusCode, Json<StoreOutcome>), ApiError> {
    let outcome = state.memory.store_memory(request).await?;
    let status = if outcome.is_retained() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

/// Handle memory search requests.
async fn search_memory(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RetrieveMemoryRequest>,
) -> Result<Json<RetrieveMemoryResponse>, ApiError> {
    Ok(Json(state.memory.retrieve_memory(request).await?))
}

/// Session selector for stats and clear.
#[derive(Debug, Deserialize)]
pub struct SessionParams {
    /// Conversation session.
    #[serde(default)]
    pub session_id: String,
    /// Requesting user.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Tier to clear; both when absent.
    #[serde(default, rename = "type")]
    pub memory_type: Option<String>,
}

/// Handle memory stats requests.
async fn memory_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SessionParams>,
) -> Result<Json<MemoryStats>, ApiError> {
    let stats = state
        .memory
        .memory_stats(&params.session_id, params.user_id.as_deref())
        .await?;
    Ok(Json(stats))
}

/// Handle memory clear requests.
async fn clear_memory(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SessionParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let removed = state
        .memory
        .clear_memory(
            &params.session_id,
            params.user_id.as_deref(),
            params.memory_type.as_deref(),
        )
        .await?;
    Ok(Json(serde_json::json!({ "removed": removed })))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AgentConfig;

    fn app() -> Router {
        let state = AppState::new(&AgentConfig::default()).unwrap_or_else(|err| unreachable!("{err}"));
        create_router(state)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|err| unreachable!("{err}"));
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap_or_else(|err| unreachable!("{err}"))
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap_or_else(|err| unreachable!("{err}"))
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), empty_request("GET", "/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_memory_round_trip_over_http() {
        let app = app();
        let stored = json!({
            "session_id": "s-1",
            "user_id": "u-1",
            "type": "working",
            "content": "Deploys fail when the cache volume is full",
            "tags": ["deploy"],
            "metadata": {"priority": "high"}
        });
        let (status, body) = send(&app, json_request("POST", "/api/memory", &stored)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["outcome"], "appended");
        let id = body["id"].clone();

        let (status, body) = send(&app, json_request("POST", "/api/memory", &stored)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["outcome"], "updated");
        assert_eq!(body["id"], id);

        let search = json!({"session_id": "s-1", "keywords": ["cache"]});
        let (status, body) = send(&app, json_request("POST", "/api/memory/search", &search)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);

        let (status, body) = send(&app, empty_request("GET", "/api/memory/stats?session_id=s-1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["working_items"], 1);

        let (status, body) = send(&app, empty_request("DELETE", "/api/memory?session_id=s-1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], 1);
    }

    #[tokio::test]
    async fn test_validation_errors_are_bad_requests() {
        let app = app();
        let unsupported = json!({"session_id": "s-1", "type": "episodic", "content": "x"});
        let (status, body) = send(&app, json_request("POST", "/api/memory", &unsupported)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unsupported memory type: episodic");

        let (status, _) = send(&app, empty_request("GET", "/api/memory/stats")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, empty_request("DELETE", "/api/memory?session_id=s-1&type=semantic")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_question_without_sources_is_answered() {
        let app = app();
        let ask = json!({
            "session_id": "s-1",
            "question": {"title": "Gateway 404", "content": "route not found", "tags": ["gateway"]}
        });
        let (status, body) = send(&app, json_request("POST", "/api/questions", &ask)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["confidence"], 0.0);
        assert!(body["recommendations"].as_array().is_some_and(|r| !r.is_empty()));

        let blank = json!({"session_id": "s-1", "question": {"title": " "}});
        let (status, _) = send(&app, json_request("POST", "/api/questions", &blank)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_session_id_is_a_bad_request() {
        let app = app();
        let store = json!({"type": "working", "content": "x"});
        let (status, body) = send(&app, json_request("POST", "/api/memory", &store)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "session id is required");

        let search = json!({"keywords": ["x"]});
        let (status, body) = send(&app, json_request("POST", "/api/memory/search", &search)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "session id is required");

        let ask = json!({"question": {"title": "t"}});
        let (status, body) = send(&app, json_request("POST", "/api/questions", &ask)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "session id is required");
    }
}
