// Scheduled-task callback route
//
// The external scheduling engine calls back here when a task fires.
// The callback appends a synthesized user turn describing the task;
// the next chat turn (or a follow-up stream) picks it up as history.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use chathook_core::{Turn, TurnStore};

/// App state for task routes
#[derive(Clone)]
pub struct AppState {
    turn_store: Arc<dyn TurnStore>,
}

impl AppState {
    pub fn new(turn_store: Arc<dyn TurnStore>) -> Self {
        Self { turn_store }
    }
}

/// Create task routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/sessions/:session_id/tasks/run", post(run_task))
        .with_state(state)
}

/// Request body for a task execution callback
#[derive(Debug, Deserialize, ToSchema)]
pub struct RunTaskRequest {
    /// Human-readable description of the task that fired
    pub description: String,
}

/// POST /v1/sessions/{session_id}/tasks/run - Record a fired scheduled task
#[utoipa::path(
    post,
    path = "/v1/sessions/{session_id}/tasks/run",
    params(("session_id" = Uuid, Path, description = "Session ID")),
    request_body = RunTaskRequest,
    responses(
        (status = 200, description = "Task turn appended", body = Turn),
        (status = 400, description = "Empty description"),
        (status = 500, description = "Storage failure")
    ),
    tag = "tasks"
)]
pub async fn run_task(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<RunTaskRequest>,
) -> Result<Json<Turn>, StatusCode> {
    if request.description.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let turn = Turn::task(&request.description);
    state
        .turn_store
        .append(session_id, turn.clone())
        .await
        .map_err(|err| {
            tracing::error!(session_id = %session_id, error = %err, "Failed to append task turn");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    tracing::info!(session_id = %session_id, "Scheduled task recorded");
    Ok(Json(turn))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use chathook_core::{InMemoryTurnStore, TurnRole};

    #[tokio::test]
    async fn task_callback_appends_synthesized_user_turn() {
        let store = InMemoryTurnStore::new();
        let app = routes(AppState::new(Arc::new(store.clone())));
        let session_id = Uuid::now_v7();

        let request = Request::builder()
            .method("POST")
            .uri(format!("/v1/sessions/{session_id}/tasks/run"))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"description":"send weekly digest"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["role"], "user");

        let turns = store.load(session_id).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, TurnRole::User);
        assert!(turns[0]
            .text()
            .unwrap()
            .contains("Scheduled task triggered: send weekly digest"));
    }

    #[tokio::test]
    async fn empty_description_is_400() {
        let app = routes(AppState::new(Arc::new(InMemoryTurnStore::new())));
        let request = Request::builder()
            .method("POST")
            .uri(format!("/v1/sessions/{}/tasks/run", Uuid::now_v7()))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"description":""}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
