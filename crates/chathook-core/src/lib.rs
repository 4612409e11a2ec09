// Webhook Ingestion and Response Streaming Pipeline
//
// This crate provides a DB-agnostic implementation of the two halves of
// the pipeline:
// - Idempotent webhook ingestion (signature check → dedup → process → store)
// - Streamed agent responses (LLM call → tool execution → repeat)
//
// Key design decisions:
// - Uses traits (EventStore, TurnStore, PayloadProcessor, LlmProvider,
//   TaskSchedule) for pluggable backends
// - The event store's id constraint is the dedup correctness mechanism;
//   the pre-insert lookup is only a fast path
// - Streams emit OutputChunk frames for SSE delivery
// - Tools are defined via a Tool trait; the ToolRegistry doubles as the
//   authority on which pending calls are executable
// - Error handling distinguishes tool-level errors (shown to the LLM)
//   from internal errors (logged and masked)

pub mod chunk;
pub mod config;
pub mod continuation;
pub mod error;
pub mod event;
pub mod ingest;
pub mod llm;
pub mod schedule;
pub mod signature;
pub mod streamer;
pub mod tools;
pub mod traits;
pub mod turn;

// In-memory implementations for examples and testing
pub mod memory;

// Re-exports for convenience
pub use chunk::OutputChunk;
pub use config::AgentConfig;
pub use continuation::{resolve_pending, ContinuationOutcome};
pub use error::{PipelineError, Result};
pub use event::{NewEvent, ProcessedEvent, StoredEvent};
pub use ingest::{IngestOutcome, IngestionHandler};
pub use llm::{
    history_to_llm_messages, turn_to_llm_messages, LlmCallConfig, LlmCompletionMetadata,
    LlmMessage, LlmMessageRole, LlmProvider, LlmResponse, LlmResponseStream, LlmStreamEvent,
};
pub use schedule::{InMemoryTaskSchedule, NoSchedule, ScheduledTask, TaskSchedule};
pub use signature::SignatureVerifier;
pub use streamer::{finish_reason, FinishCallback, ResponseStreamer, StreamOutcome};
pub use tools::{
    EchoTool, GetCurrentTimeTool, Tool, ToolCall, ToolDefinition, ToolExecutionResult, ToolPolicy,
    ToolRegistry, ToolRegistryBuilder, ToolResult,
};
pub use traits::{EventStore, InsertOutcome, PayloadProcessor, TurnStore};
pub use turn::{ContentPart, Turn, TurnRole};

pub use memory::{
    FailingProcessor, InMemoryEventStore, InMemoryTurnStore, MockLlmProvider, MockLlmResponse,
    RecordingProcessor,
};
