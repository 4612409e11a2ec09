// In-memory backend implementations
//
// Used by examples and tests. The event store keeps the same atomic
// insert-if-absent contract as the Postgres implementation so the
// ingestion handler behaves identically against either backend.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::event::{NewEvent, ProcessedEvent, StoredEvent};
use crate::llm::{
    LlmCallConfig, LlmCompletionMetadata, LlmMessage, LlmProvider, LlmResponseStream,
    LlmStreamEvent,
};
use crate::tools::ToolCall;
use crate::traits::{EventStore, InsertOutcome, PayloadProcessor, TurnStore};
use crate::turn::Turn;

// ============================================================================
// InMemoryEventStore
// ============================================================================

/// In-memory event store keyed by delivery id
#[derive(Debug, Default, Clone)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<HashMap<String, StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn find(&self, id: &str) -> Result<Option<StoredEvent>> {
        Ok(self.events.read().await.get(id).cloned())
    }

    async fn insert(&self, event: NewEvent) -> Result<InsertOutcome> {
        // The write lock is held across check and insert, matching the
        // atomicity of the database's primary key constraint.
        let mut events = self.events.write().await;
        if events.contains_key(&event.id) {
            return Ok(InsertOutcome::DuplicateId);
        }

        let stored = StoredEvent {
            id: event.id.clone(),
            kind: event.kind,
            action: event.action,
            title: event.title,
            description: event.description,
            url: event.url,
            actor: event.actor,
            payload: event.payload,
            occurred_at: event.occurred_at,
            received_at: Utc::now(),
        };
        events.insert(event.id, stored);
        Ok(InsertOutcome::Inserted)
    }

    async fn list(&self, limit: usize) -> Result<Vec<StoredEvent>> {
        let events = self.events.read().await;
        let mut all: Vec<StoredEvent> = events.values().cloned().collect();
        all.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        all.truncate(limit);
        Ok(all)
    }
}

// ============================================================================
// InMemoryTurnStore
// ============================================================================

/// In-memory conversation store keyed by session id
#[derive(Debug, Default, Clone)]
pub struct InMemoryTurnStore {
    sessions: Arc<RwLock<HashMap<Uuid, Vec<Turn>>>>,
}

impl InMemoryTurnStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a session's history wholesale. Test helper.
    pub async fn seed(&self, session_id: Uuid, turns: Vec<Turn>) {
        self.sessions.write().await.insert(session_id, turns);
    }
}

#[async_trait]
impl TurnStore for InMemoryTurnStore {
    async fn append(&self, session_id: Uuid, turn: Turn) -> Result<()> {
        self.sessions
            .write()
            .await
            .entry(session_id)
            .or_default()
            .push(turn);
        Ok(())
    }

    async fn load(&self, session_id: Uuid) -> Result<Vec<Turn>> {
        Ok(self
            .sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// Payload processors for tests
// ============================================================================

/// Processor that records calls and derives a title from the kind
#[derive(Debug, Default, Clone)]
pub struct RecordingProcessor {
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl PayloadProcessor for RecordingProcessor {
    async fn process(&self, kind: &str, _payload: &serde_json::Value) -> Result<ProcessedEvent> {
        self.calls.lock().await.push(kind.to_string());
        Ok(ProcessedEvent {
            title: format!("{kind} event"),
            ..Default::default()
        })
    }
}

/// Processor that always fails with a payload-processing error
#[derive(Debug, Clone)]
pub struct FailingProcessor {
    message: String,
}

impl FailingProcessor {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl PayloadProcessor for FailingProcessor {
    async fn process(&self, _kind: &str, _payload: &serde_json::Value) -> Result<ProcessedEvent> {
        Err(PipelineError::processing(self.message.clone()))
    }
}

// ============================================================================
// MockLlmProvider
// ============================================================================

/// One scripted response for the mock provider
#[derive(Debug, Clone, Default)]
pub struct MockLlmResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    /// When set, the stream yields only this error event
    pub error: Option<String>,
}

impl MockLlmResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Mock LLM provider that replays scripted responses in order.
///
/// When the queue runs dry the provider keeps returning the last
/// response, which lets a max-steps test loop indefinitely without
/// scripting every step.
#[derive(Default, Clone)]
pub struct MockLlmProvider {
    responses: Arc<Mutex<Vec<MockLlmResponse>>>,
    calls: Arc<Mutex<Vec<Vec<LlmMessage>>>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response
    pub async fn add_response(&self, response: MockLlmResponse) {
        self.responses.lock().await.push(response);
    }

    /// Replace the whole response queue
    pub async fn set_responses(&self, responses: Vec<MockLlmResponse>) {
        *self.responses.lock().await = responses;
    }

    /// Messages received across all calls, in call order
    pub async fn calls(&self) -> Vec<Vec<LlmMessage>> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn chat_completion_stream(
        &self,
        messages: Vec<LlmMessage>,
        _config: &LlmCallConfig,
    ) -> Result<LlmResponseStream> {
        self.calls.lock().await.push(messages);

        let response = {
            let mut responses = self.responses.lock().await;
            if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses.first().cloned().unwrap_or_default()
            }
        };

        if let Some(message) = response.error {
            return Ok(Box::pin(futures::stream::iter(vec![Ok(
                LlmStreamEvent::Error(message),
            )])));
        }

        let mut events = Vec::new();
        if !response.text.is_empty() {
            events.push(Ok(LlmStreamEvent::TextDelta(response.text)));
        }
        let finish_reason = if response.tool_calls.is_empty() {
            "stop"
        } else {
            events.push(Ok(LlmStreamEvent::ToolCalls(response.tool_calls)));
            "tool_calls"
        };
        events.push(Ok(LlmStreamEvent::Done(LlmCompletionMetadata {
            model: Some("mock".to_string()),
            finish_reason: Some(finish_reason.to_string()),
        })));

        Ok(Box::pin(futures::stream::iter(events)))
    }
}
