// Webhook intake route
//
// One POST endpoint. The raw body is verified against the HMAC
// signature header before anything is parsed; dedup and persistence
// happen in the core ingestion handler.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use chathook_core::{
    EventStore, IngestOutcome, IngestionHandler, PayloadProcessor, SignatureVerifier,
};

pub const EVENT_TYPE_HEADER: &str = "x-event-type";
pub const SIGNATURE_HEADER: &str = "x-signature";
pub const DELIVERY_ID_HEADER: &str = "x-delivery-id";

/// App state for webhook routes
#[derive(Clone)]
pub struct AppState {
    handler: Arc<IngestionHandler<Arc<dyn EventStore>, Arc<dyn PayloadProcessor>>>,
    verifier: Arc<SignatureVerifier>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EventStore>,
        processor: Arc<dyn PayloadProcessor>,
        verifier: Arc<SignatureVerifier>,
    ) -> Self {
        Self {
            handler: Arc::new(IngestionHandler::new(store, processor)),
            verifier,
        }
    }
}

/// Create webhook routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/webhooks", post(receive_webhook))
        .with_state(state)
}

/// Response body for accepted deliveries
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponse {
    /// "processed" or "already_processed"
    pub status: String,
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

/// POST /v1/webhooks - Receive one webhook delivery
///
/// Redeliveries of an already accepted delivery id return 200 without
/// side effects, so senders can retry safely.
#[utoipa::path(
    post,
    path = "/v1/webhooks",
    request_body = serde_json::Value,
    params(
        ("x-event-type" = String, Header, description = "Notification kind"),
        ("x-signature" = String, Header, description = "HMAC-SHA256 hex signature of the raw body"),
        ("x-delivery-id" = String, Header, description = "Sender-supplied delivery identifier (dedup key)"),
    ),
    responses(
        (status = 200, description = "Delivery accepted", body = WebhookResponse),
        (status = 400, description = "Missing delivery id or malformed body"),
        (status = 401, description = "Signature verification failed"),
        (status = 500, description = "Processing failed; sender should redeliver")
    ),
    tag = "webhooks"
)]
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    if !state.verifier.verify(&body, signature) {
        tracing::warn!("Webhook rejected: signature verification failed");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "invalid signature" })),
        )
            .into_response();
    }

    let Some(delivery_id) = headers
        .get(DELIVERY_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
    else {
        return bad_request("missing x-delivery-id header");
    };

    let Some(kind) = headers
        .get(EVENT_TYPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
    else {
        return bad_request("missing x-event-type header");
    };

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => return bad_request("body is not valid JSON"),
    };

    match state.handler.handle(delivery_id, kind, payload).await {
        Ok(IngestOutcome::Processed) => (
            StatusCode::OK,
            Json(WebhookResponse {
                status: "processed".to_string(),
            }),
        )
            .into_response(),
        Ok(IngestOutcome::AlreadyProcessed) => (
            StatusCode::OK,
            Json(WebhookResponse {
                status: "already_processed".to_string(),
            }),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(delivery_id = %delivery_id, error = %err, "Webhook processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "processing failed" })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use chathook_core::memory::{FailingProcessor, InMemoryEventStore, RecordingProcessor};

    const SECRET: &str = "test-secret";

    fn app(store: InMemoryEventStore) -> Router {
        let state = AppState::new(
            Arc::new(store),
            Arc::new(RecordingProcessor::new()),
            Arc::new(SignatureVerifier::new(SECRET)),
        );
        routes(state)
    }

    fn signed_request(delivery_id: &str, body: &str) -> Request<Body> {
        let signature = SignatureVerifier::new(SECRET).sign(body.as_bytes());
        Request::builder()
            .method("POST")
            .uri("/v1/webhooks")
            .header("content-type", "application/json")
            .header(EVENT_TYPE_HEADER, "push")
            .header(DELIVERY_ID_HEADER, delivery_id)
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn valid_delivery_returns_200_and_stores_one_row() {
        let store = InMemoryEventStore::new();
        let app = app(store.clone());

        let response = app
            .oneshot(signed_request("d-1", r#"{"ref":"main"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "processed");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn redelivery_returns_200_with_still_one_row() {
        let store = InMemoryEventStore::new();

        let first = app(store.clone())
            .oneshot(signed_request("d-1", r#"{"ref":"main"}"#))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app(store.clone())
            .oneshot(signed_request("d-1", r#"{"ref":"main"}"#))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);

        let body = second.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "already_processed");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn bad_signature_is_401() {
        let store = InMemoryEventStore::new();
        let app = app(store.clone());

        let request = Request::builder()
            .method("POST")
            .uri("/v1/webhooks")
            .header(EVENT_TYPE_HEADER, "push")
            .header(DELIVERY_ID_HEADER, "d-1")
            .header(SIGNATURE_HEADER, "deadbeef")
            .body(Body::from(r#"{"ref":"main"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn missing_delivery_id_is_400() {
        let app = app(InMemoryEventStore::new());
        let body = r#"{"ref":"main"}"#;
        let signature = SignatureVerifier::new(SECRET).sign(body.as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/v1/webhooks")
            .header(EVENT_TYPE_HEADER, "push")
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_json_body_is_400() {
        let app = app(InMemoryEventStore::new());
        let body = "not json";
        let signature = SignatureVerifier::new(SECRET).sign(body.as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/v1/webhooks")
            .header(EVENT_TYPE_HEADER, "push")
            .header(DELIVERY_ID_HEADER, "d-1")
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wrong_method_is_405() {
        let app = app(InMemoryEventStore::new());
        let request = Request::builder()
            .method("GET")
            .uri("/v1/webhooks")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn processing_failure_is_500_and_writes_nothing() {
        let store = InMemoryEventStore::new();
        let state = AppState::new(
            Arc::new(store.clone()),
            Arc::new(FailingProcessor::new("boom")),
            Arc::new(SignatureVerifier::new(SECRET)),
        );
        let app = routes(state);

        let response = app
            .oneshot(signed_request("d-1", r#"{"ref":"main"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.len().await, 0);
    }
}
