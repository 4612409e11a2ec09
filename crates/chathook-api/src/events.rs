// Stored event listing (display/audit)

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use chathook_core::{EventStore, StoredEvent};

use crate::common::ListResponse;

const DEFAULT_LIMIT: usize = 100;

/// App state for event routes
#[derive(Clone)]
pub struct AppState {
    event_store: Arc<dyn EventStore>,
}

impl AppState {
    pub fn new(event_store: Arc<dyn EventStore>) -> Self {
        Self { event_store }
    }
}

/// Create event routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/events", get(list_events))
        .with_state(state)
}

/// Query parameters for the event list
#[derive(Debug, Deserialize, IntoParams)]
pub struct EventsQuery {
    /// Maximum number of events to return. Defaults to 100.
    #[param(example = 100)]
    pub limit: Option<usize>,
}

/// GET /v1/events - List stored events, newest first
#[utoipa::path(
    get,
    path = "/v1/events",
    params(EventsQuery),
    responses(
        (status = 200, description = "Event list", body = ListResponse<StoredEvent>),
        (status = 500, description = "Storage failure")
    ),
    tag = "events"
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<ListResponse<StoredEvent>>, StatusCode> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let events = state.event_store.list(limit).await.map_err(|err| {
        tracing::error!(error = %err, "Failed to list events");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(ListResponse::from(events)))
}
