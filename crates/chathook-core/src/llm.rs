// LLM provider types
//
// Provider-agnostic types for streamed LLM interactions. Concrete
// providers (chathook-openai, the in-memory mock) implement
// `LlmProvider` and translate these types into their wire formats.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::config::AgentConfig;
use crate::error::Result;
use crate::tools::{ToolCall, ToolDefinition};
use crate::turn::{ContentPart, Turn, TurnRole};

/// Type alias for the LLM response stream
pub type LlmResponseStream = Pin<Box<dyn Stream<Item = Result<LlmStreamEvent>> + Send>>;

/// Events emitted during LLM streaming
#[derive(Debug, Clone)]
pub enum LlmStreamEvent {
    /// Text delta (incremental content)
    TextDelta(String),
    /// Tool calls from the LLM
    ToolCalls(Vec<ToolCall>),
    /// Streaming completed
    Done(LlmCompletionMetadata),
    /// Error during streaming
    Error(String),
}

/// Metadata about LLM completion
#[derive(Debug, Clone, Default)]
pub struct LlmCompletionMetadata {
    /// Model used
    pub model: Option<String>,
    /// Finish reason reported by the provider
    pub finish_reason: Option<String>,
}

/// Trait for LLM providers
///
/// Implementations handle provider-specific API calls and response
/// parsing.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Call the LLM with streaming response
    async fn chat_completion_stream(
        &self,
        messages: Vec<LlmMessage>,
        config: &LlmCallConfig,
    ) -> Result<LlmResponseStream>;

    /// Call the LLM without streaming (convenience method)
    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        config: &LlmCallConfig,
    ) -> Result<LlmResponse> {
        use futures::StreamExt;

        let mut stream = self.chat_completion_stream(messages, config).await?;
        let mut text = String::new();
        let mut tool_calls = Vec::new();
        let mut metadata = LlmCompletionMetadata::default();

        while let Some(event) = stream.next().await {
            match event? {
                LlmStreamEvent::TextDelta(delta) => text.push_str(&delta),
                LlmStreamEvent::ToolCalls(calls) => tool_calls = calls,
                LlmStreamEvent::Done(meta) => metadata = meta,
                LlmStreamEvent::Error(err) => return Err(crate::error::PipelineError::llm(err)),
            }
        }

        Ok(LlmResponse {
            text,
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            metadata,
        })
    }
}

/// Message format for LLM calls (provider-agnostic)
#[derive(Debug, Clone)]
pub struct LlmMessage {
    pub role: LlmMessageRole,
    pub content: String,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub tool_call_id: Option<String>,
}

impl LlmMessage {
    /// Create a plain text message
    pub fn text(role: LlmMessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(LlmMessageRole::System, content)
    }
}

/// Message role for LLM calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmMessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// Configuration for one LLM call
#[derive(Debug, Clone)]
pub struct LlmCallConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub tools: Vec<ToolDefinition>,
}

impl From<&AgentConfig> for LlmCallConfig {
    fn from(config: &AgentConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            tools: config.tools.clone(),
        }
    }
}

/// Response from an LLM call (non-streaming)
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub metadata: LlmCompletionMetadata,
}

// ============================================================================
// Conversion from conversation turns
// ============================================================================

/// Flatten a turn into provider messages.
///
/// An assistant turn with tool calls becomes a single assistant message
/// carrying them; a tool turn fans out into one message per result so
/// each keeps its `tool_call_id` pairing.
pub fn turn_to_llm_messages(turn: &Turn) -> Vec<LlmMessage> {
    match turn.role {
        TurnRole::User => vec![LlmMessage::text(
            LlmMessageRole::User,
            turn.text().unwrap_or_default(),
        )],
        TurnRole::Assistant => {
            let tool_calls: Vec<ToolCall> = turn.tool_calls().into_iter().cloned().collect();
            vec![LlmMessage {
                role: LlmMessageRole::Assistant,
                content: turn.text().unwrap_or_default(),
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(tool_calls)
                },
                tool_call_id: None,
            }]
        }
        TurnRole::Tool => turn
            .content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolResult(tr) => Some(LlmMessage {
                    role: LlmMessageRole::Tool,
                    content: match (&tr.result, &tr.error) {
                        (_, Some(err)) => {
                            serde_json::json!({ "error": err }).to_string()
                        }
                        (Some(result), None) => result.to_string(),
                        (None, None) => "{}".to_string(),
                    },
                    tool_calls: None,
                    tool_call_id: Some(tr.tool_call_id.clone()),
                }),
                _ => None,
            })
            .collect(),
    }
}

/// Convert a history to provider messages, prefixed with a system prompt
pub fn history_to_llm_messages(system_prompt: &str, history: &[Turn]) -> Vec<LlmMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(LlmMessage::system(system_prompt));
    for turn in history {
        messages.extend(turn_to_llm_messages(turn));
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolResult;
    use serde_json::json;

    #[test]
    fn user_turn_converts_to_user_message() {
        let messages = turn_to_llm_messages(&Turn::user("hi"));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, LlmMessageRole::User);
        assert_eq!(messages[0].content, "hi");
    }

    #[test]
    fn assistant_turn_keeps_tool_calls() {
        let turn = Turn::assistant_with_tools(
            "on it",
            vec![ToolCall {
                id: "call_1".to_string(),
                name: "lookup".to_string(),
                arguments: json!({}),
            }],
        );

        let messages = turn_to_llm_messages(&turn);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].tool_calls.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn tool_turn_fans_out_per_result() {
        let turn = Turn::tool_results(vec![
            ToolResult {
                tool_call_id: "call_1".to_string(),
                result: Some(json!({"ok": true})),
                error: None,
            },
            ToolResult {
                tool_call_id: "call_2".to_string(),
                result: None,
                error: Some("boom".to_string()),
            },
        ]);

        let messages = turn_to_llm_messages(&turn);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].tool_call_id.as_deref(), Some("call_1"));
        assert!(messages[1].content.contains("boom"));
    }

    #[test]
    fn history_starts_with_system_prompt() {
        let history = vec![Turn::user("hello")];
        let messages = history_to_llm_messages("You are helpful.", &history);
        assert_eq!(messages[0].role, LlmMessageRole::System);
        assert_eq!(messages.len(), 2);
    }
}
