// OpenAI-compatible chat completions driver
//
// Implements LlmProvider against the streaming chat completions
// protocol. Tool-call fragments arrive interleaved across SSE chunks
// and are accumulated by index until the finish_reason settles them.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tracing::{error, warn};

use chathook_core::{
    LlmCallConfig, LlmCompletionMetadata, LlmMessage, LlmMessageRole, LlmProvider,
    LlmResponseStream, LlmStreamEvent, PipelineError, Result, ToolCall, ToolDefinition,
};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible streaming LLM provider
#[derive(Clone)]
pub struct OpenAiDriver {
    client: Client,
    api_key: String,
    api_url: String,
}

impl OpenAiDriver {
    /// Create a new driver with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Create a new driver from the OPENAI_API_KEY environment variable
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| PipelineError::llm("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key))
    }

    /// Create a new driver with a custom API URL (for OpenAI-compatible APIs)
    pub fn with_base_url(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: api_url.into(),
        }
    }

    fn convert_role(role: LlmMessageRole) -> &'static str {
        match role {
            LlmMessageRole::System => "system",
            LlmMessageRole::User => "user",
            LlmMessageRole::Assistant => "assistant",
            LlmMessageRole::Tool => "tool",
        }
    }

    fn convert_message(msg: &LlmMessage) -> OpenAiMessage {
        OpenAiMessage {
            role: Self::convert_role(msg.role).to_string(),
            content: Some(msg.content.clone()),
            tool_calls: msg.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|tc| OpenAiToolCall {
                        id: tc.id.clone(),
                        r#type: "function".to_string(),
                        function: OpenAiFunctionCall {
                            name: tc.name.clone(),
                            arguments: serde_json::to_string(&tc.arguments).unwrap_or_default(),
                        },
                    })
                    .collect()
            }),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Vec<OpenAiTool> {
        tools
            .iter()
            .map(|tool| OpenAiTool {
                r#type: "function".to_string(),
                function: OpenAiFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                },
            })
            .collect()
    }
}

#[async_trait]
impl LlmProvider for OpenAiDriver {
    async fn chat_completion_stream(
        &self,
        messages: Vec<LlmMessage>,
        config: &LlmCallConfig,
    ) -> Result<LlmResponseStream> {
        let openai_messages: Vec<OpenAiMessage> =
            messages.iter().map(Self::convert_message).collect();

        let tools = if config.tools.is_empty() {
            None
        } else {
            Some(Self::convert_tools(&config.tools))
        };

        let request = OpenAiRequest {
            model: config.model.clone(),
            messages: openai_messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stream: true,
            tools,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Chat completion request failed to send");
                PipelineError::llm(format!("Failed to send request: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(status = %status, "Chat completion request rejected");
            return Err(PipelineError::llm(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let event_stream = response.bytes_stream().eventsource();

        let model = config.model.clone();
        let accumulated_tool_calls = Arc::new(Mutex::new(Vec::<ToolCall>::new()));

        let converted_stream: LlmResponseStream = Box::pin(event_stream.filter_map(move |result| {
            let model = model.clone();
            let accumulated_tool_calls = Arc::clone(&accumulated_tool_calls);

            async move {
                let event = match result {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "Provider stream transport error");
                        return Some(Ok(LlmStreamEvent::Error(format!("Stream error: {}", e))));
                    }
                };

                if event.data == "[DONE]" {
                    return Some(Ok(LlmStreamEvent::Done(LlmCompletionMetadata {
                        model: Some(model),
                        finish_reason: Some("stop".to_string()),
                    })));
                }

                let chunk = match serde_json::from_str::<OpenAiStreamChunk>(&event.data) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!(error = %e, "Unparseable stream chunk");
                        return Some(Ok(LlmStreamEvent::Error(format!(
                            "Failed to parse chunk: {}",
                            e
                        ))));
                    }
                };

                let choice = chunk.choices.first()?;

                // Tool-call fragments accumulate by index until the
                // finish_reason arrives
                if let Some(tool_calls) = &choice.delta.tool_calls {
                    let mut acc = accumulated_tool_calls.lock().ok()?;

                    for tc in tool_calls {
                        let idx = tc.index as usize;
                        while acc.len() <= idx {
                            acc.push(ToolCall {
                                id: String::new(),
                                name: String::new(),
                                arguments: json!(""),
                            });
                        }

                        if let Some(id) = &tc.id {
                            acc[idx].id = id.clone();
                        }
                        if let Some(function) = &tc.function {
                            if let Some(name) = &function.name {
                                acc[idx].name = name.clone();
                            }
                            if let Some(args) = &function.arguments {
                                let current = acc[idx].arguments.as_str().unwrap_or("");
                                acc[idx].arguments = json!(format!("{}{}", current, args));
                            }
                        }
                    }
                    return None;
                }

                if let Some(content) = &choice.delta.content {
                    if content.is_empty() {
                        return None;
                    }
                    return Some(Ok(LlmStreamEvent::TextDelta(content.clone())));
                }

                if let Some(finish_reason) = &choice.finish_reason {
                    if finish_reason == "tool_calls" {
                        let calls = accumulated_tool_calls.lock().ok()?.clone();
                        if !calls.is_empty() {
                            // Argument fragments were accumulated as a
                            // string; parse them into JSON now
                            let parsed: Vec<ToolCall> = calls
                                .into_iter()
                                .map(|mut tc| {
                                    if let Some(args) = tc.arguments.as_str() {
                                        tc.arguments =
                                            serde_json::from_str(args).unwrap_or(json!({}));
                                    }
                                    tc
                                })
                                .collect();
                            return Some(Ok(LlmStreamEvent::ToolCalls(parsed)));
                        }
                    }

                    return Some(Ok(LlmStreamEvent::Done(LlmCompletionMetadata {
                        model: Some(model),
                        finish_reason: Some(finish_reason.clone()),
                    })));
                }

                None
            }
        }));

        Ok(converted_stream)
    }
}

impl std::fmt::Debug for OpenAiDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiDriver")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiTool {
    r#type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    r#type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiStreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamToolCall {
    index: u32,
    id: Option<String>,
    function: Option<OpenAiStreamFunction>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}
