// Chat turn routes
//
// POST appends the user turn and streams the agent response as SSE;
// GET lists a session's history. Client disconnect drops the SSE
// stream, which drops the cancellation guard and stops the model call.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;
use uuid::Uuid;

use chathook_core::{ResponseStreamer, Turn, TurnStore};

use crate::common::ListResponse;

/// App state for chat routes
#[derive(Clone)]
pub struct AppState {
    turn_store: Arc<dyn TurnStore>,
    streamer: ResponseStreamer,
}

impl AppState {
    pub fn new(turn_store: Arc<dyn TurnStore>, streamer: ResponseStreamer) -> Self {
        Self {
            turn_store,
            streamer,
        }
    }
}

/// Create chat routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/sessions/:session_id/turns",
            post(create_turn).get(list_turns),
        )
        .with_state(state)
}

/// Request body for submitting a user turn
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTurnRequest {
    pub message: String,
}

/// POST /v1/sessions/{session_id}/turns - Submit a user turn, stream the response
///
/// The response is an SSE stream of tagged output chunks ending with a
/// `completed` or `error` event. Turns produced during the stream are
/// persisted to the session when the stream finishes.
#[utoipa::path(
    post,
    path = "/v1/sessions/{session_id}/turns",
    params(("session_id" = Uuid, Path, description = "Session ID")),
    request_body = CreateTurnRequest,
    responses(
        (status = 200, description = "Chunk stream", content_type = "text/event-stream"),
        (status = 400, description = "Empty message"),
        (status = 500, description = "Storage failure")
    ),
    tag = "chat"
)]
pub async fn create_turn(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<CreateTurnRequest>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, StatusCode> {
    if request.message.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    state
        .turn_store
        .append(session_id, Turn::user(request.message))
        .await
        .map_err(|err| {
            tracing::error!(session_id = %session_id, error = %err, "Failed to append user turn");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let history = state.turn_store.load(session_id).await.map_err(|err| {
        tracing::error!(session_id = %session_id, error = %err, "Failed to load history");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let cancel = CancellationToken::new();
    // Dropping the SSE stream drops this guard and cancels the loop
    let guard = cancel.clone().drop_guard();

    let store = state.turn_store.clone();
    let chunks = state.streamer.stream(
        history,
        cancel,
        Box::new(move |outcome| {
            tokio::spawn(async move {
                for turn in outcome.turns {
                    if let Err(err) = store.append(session_id, turn).await {
                        tracing::error!(session_id = %session_id, error = %err, "Failed to persist turn");
                    }
                }
            });
        }),
    );

    let sse_stream = chunks.map(move |chunk| {
        let _guard = &guard;
        let event = SseEvent::default().event(chunk.event_name());
        let event = match serde_json::to_string(&chunk) {
            Ok(data) => event.data(data),
            Err(_) => event.data("{}"),
        };
        Ok::<_, Infallible>(event)
    });

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}

/// GET /v1/sessions/{session_id}/turns - List a session's turns in order
#[utoipa::path(
    get,
    path = "/v1/sessions/{session_id}/turns",
    params(("session_id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Turn list", body = ListResponse<Turn>),
        (status = 500, description = "Storage failure")
    ),
    tag = "chat"
)]
pub async fn list_turns(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ListResponse<Turn>>, StatusCode> {
    let turns = state.turn_store.load(session_id).await.map_err(|err| {
        tracing::error!(session_id = %session_id, error = %err, "Failed to load turns");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(ListResponse::from(turns)))
}
