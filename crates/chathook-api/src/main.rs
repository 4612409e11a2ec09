// Chathook API server
// Decision: Required secrets come from the environment and fail fast at startup
// Decision: The scheduling engine is external; its callbacks land on the tasks route

mod chat;
mod common;
mod events;
mod processor;
mod tasks;
mod webhooks;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use chathook_core::{
    AgentConfig, ContentPart, EchoTool, EventStore, GetCurrentTimeTool, InMemoryTaskSchedule,
    ResponseStreamer, ScheduledTask, SignatureVerifier, StoredEvent, ToolCall, ToolDefinition,
    ToolPolicy, ToolRegistry, ToolResult, Turn, TurnRole, TurnStore,
};
use chathook_openai::OpenAiDriver;
use chathook_storage::{Database, DbEventStore, DbTurnStore};

use common::ListResponse;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        webhooks::receive_webhook,
        chat::create_turn,
        chat::list_turns,
        tasks::run_task,
        events::list_events,
    ),
    components(
        schemas(
            webhooks::WebhookResponse,
            chat::CreateTurnRequest,
            tasks::RunTaskRequest,
            Turn, TurnRole, ContentPart,
            ToolCall, ToolResult, ToolDefinition, ToolPolicy,
            StoredEvent, ScheduledTask,
            ListResponse<Turn>,
            ListResponse<StoredEvent>,
        )
    ),
    tags(
        (name = "webhooks", description = "Webhook intake"),
        (name = "chat", description = "Chat turn submission and streaming"),
        (name = "tasks", description = "Scheduled task callbacks"),
        (name = "events", description = "Stored event listing")
    ),
    info(
        title = "Chathook API",
        version = "0.1.0",
        description = "Idempotent webhook ingestion and streamed agent chat",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chathook_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("chathook-api starting...");

    // Required configuration
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL environment variable required")?;
    let signing_secret = std::env::var("WEBHOOK_SIGNING_SECRET")
        .context("WEBHOOK_SIGNING_SECRET environment variable required")?;
    let openai_api_key = std::env::var("OPENAI_API_KEY")
        .context("OPENAI_API_KEY environment variable required")?;

    // Initialize database
    let db = Database::from_url(&database_url)
        .await
        .context("Failed to connect to database")?;
    db.run_migrations()
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Connected to database, migrations applied");

    let event_store: Arc<dyn EventStore> = Arc::new(DbEventStore::new(db.clone()));
    let turn_store: Arc<dyn TurnStore> = Arc::new(DbTurnStore::new(db.clone()));

    // LLM driver (optional custom endpoint for OpenAI-compatible APIs)
    let driver = match std::env::var("OPENAI_BASE_URL") {
        Ok(base_url) if !base_url.is_empty() => {
            tracing::info!(base_url = %base_url, "Using custom LLM endpoint");
            OpenAiDriver::with_base_url(openai_api_key, base_url)
        }
        _ => OpenAiDriver::new(openai_api_key),
    };

    // Agent configuration
    let model = std::env::var("CHATHOOK_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
    let system_prompt = std::env::var("CHATHOOK_SYSTEM_PROMPT")
        .unwrap_or_else(|_| "You are a helpful assistant.".to_string());
    let registry = ToolRegistry::builder()
        .tool(EchoTool)
        .tool(GetCurrentTimeTool)
        .build();
    let config = AgentConfig::new(system_prompt, &model).with_tools(registry.tool_definitions());
    tracing::info!(model = %model, tools = ?registry.tool_names(), "Agent configured");

    let schedule = Arc::new(InMemoryTaskSchedule::new());
    let streamer = ResponseStreamer::new(Arc::new(driver), config)
        .with_registry(registry)
        .with_schedule(schedule);

    // Module-specific states
    let webhooks_state = webhooks::AppState::new(
        event_store.clone(),
        Arc::new(processor::StandardProcessor::new()),
        Arc::new(SignatureVerifier::new(signing_secret)),
    );
    let chat_state = chat::AppState::new(turn_store.clone(), streamer);
    let tasks_state = tasks::AppState::new(turn_store.clone());
    let events_state = events::AppState::new(event_store.clone());

    // Load API prefix from environment (default: empty)
    let api_prefix = std::env::var("API_PREFIX").unwrap_or_default();
    if !api_prefix.is_empty() {
        tracing::info!(prefix = %api_prefix, "API prefix configured");
    }

    // CORS origins, only needed when the UI is served from another origin
    let cors_origins: Vec<HeaderValue> = std::env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .filter(|s| !s.is_empty())
        .map(|s| s.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();

    if cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
    } else {
        tracing::info!(origins = ?cors_origins, "CORS origins configured");
    }

    let api_routes = Router::new()
        .merge(webhooks::routes(webhooks_state))
        .merge(chat::routes(chat_state))
        .merge(tasks::routes(tasks_state))
        .merge(events::routes(events_state));

    let mut app = Router::new().route("/health", get(health));
    app = app.merge(build_router_with_prefix(api_routes, &api_prefix));

    let app =
        app.merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    let app = if !cors_origins.is_empty() {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::CACHE_CONTROL]),
        )
    } else {
        app
    };

    let app = app.layer(TraceLayer::new_for_http());

    // Start server
    let addr = std::env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:9000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Build router with optional API prefix (extracted for testing)
fn build_router_with_prefix(api_routes: Router, api_prefix: &str) -> Router {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}
