// Tool abstraction for the response streamer
//
// Tools are defined via the `Tool` trait and registered with a
// `ToolRegistry`. The registry is also how the continuation pass decides
// whether a pending tool call has an execution handler at all: calls
// with no registered tool (e.g. awaiting a human decision) are stripped
// rather than executed.
//
// Error handling distinguishes tool-level errors (shown to the LLM) from
// internal errors (logged, replaced with a generic message).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Tool policy determines how tool calls are handled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ToolPolicy {
    /// Execute immediately without user approval
    #[default]
    Auto,
    /// Require user approval before execution
    RequiresApproval,
}

/// Tool definition handed to the LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ToolDefinition {
    /// Tool name (used by the LLM and for registry lookup)
    pub name: String,
    /// Tool description for the LLM
    pub description: String,
    /// JSON schema for tool parameters
    pub parameters: Value,
    /// Tool policy (auto or requires_approval)
    #[serde(default)]
    pub policy: ToolPolicy,
}

/// Tool call from an LLM response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ToolCall {
    /// Unique ID for this tool call
    pub id: String,
    /// Tool name to execute
    pub name: String,
    /// Arguments as JSON
    pub arguments: Value,
}

/// Tool execution result paired with the originating call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ToolResult {
    /// Tool call ID this result corresponds to
    pub tool_call_id: String,
    /// Result data (success)
    pub result: Option<Value>,
    /// Error message (failure)
    pub error: Option<String>,
}

// ============================================================================
// Tool execution outcome
// ============================================================================

/// Outcome of executing a tool.
///
/// - `Success`: result is returned to the LLM
/// - `ToolError`: expected error condition, safe to show to the LLM
/// - `InternalError`: system-level failure; logged, but replaced with a
///   generic message so internals never leak into the conversation
#[derive(Debug)]
pub enum ToolExecutionResult {
    Success(Value),
    ToolError(String),
    InternalError(String),
}

impl ToolExecutionResult {
    /// Create a successful result
    pub fn success(value: impl Into<Value>) -> Self {
        ToolExecutionResult::Success(value.into())
    }

    /// Create a tool-level error (safe to show to the LLM)
    pub fn tool_error(message: impl Into<String>) -> Self {
        ToolExecutionResult::ToolError(message.into())
    }

    /// Create an internal error (hidden from the LLM)
    pub fn internal_error(message: impl Into<String>) -> Self {
        ToolExecutionResult::InternalError(message.into())
    }

    /// Convert to a ToolResult for the conversation.
    ///
    /// Failures are carried in the `error` field so the model can react
    /// to them in-band; they are never surfaced as a stream failure.
    pub fn into_tool_result(self, tool_call_id: &str, tool_name: &str) -> ToolResult {
        match self {
            ToolExecutionResult::Success(value) => ToolResult {
                tool_call_id: tool_call_id.to_string(),
                result: Some(value),
                error: None,
            },
            ToolExecutionResult::ToolError(message) => ToolResult {
                tool_call_id: tool_call_id.to_string(),
                result: None,
                error: Some(message),
            },
            ToolExecutionResult::InternalError(message) => {
                error!(
                    tool_name = %tool_name,
                    tool_call_id = %tool_call_id,
                    error = %message,
                    "Tool internal error (details hidden from LLM)"
                );
                ToolResult {
                    tool_call_id: tool_call_id.to_string(),
                    result: None,
                    error: Some("An internal error occurred while executing the tool".to_string()),
                }
            }
        }
    }
}

// ============================================================================
// Tool trait
// ============================================================================

/// Trait for implementing tools executable by the response streamer
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's unique name, used by the LLM to invoke it
    fn name(&self) -> &str;

    /// Description provided to the LLM
    fn description(&self) -> &str;

    /// JSON schema for the tool's parameters
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments
    async fn execute(&self, arguments: Value) -> ToolExecutionResult;

    /// Tool policy; override for operations that need approval
    fn policy(&self) -> ToolPolicy {
        ToolPolicy::Auto
    }

    /// Convert this tool to a definition for the LLM provider
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
            policy: self.policy(),
        }
    }
}

// ============================================================================
// ToolRegistry
// ============================================================================

/// A registry of tools keyed by name.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. A tool with the same name is replaced.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Check whether an execution handler is registered for a tool name
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool names
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool definitions for the LLM call configuration
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool call, returning `None` when no handler is
    /// registered for the tool name.
    ///
    /// Handler failures come back as error tool-results, never as a
    /// returned error, so the model can react to them in-band.
    pub async fn execute_call(&self, tool_call: &ToolCall) -> Option<ToolResult> {
        let tool = self.tools.get(&tool_call.name)?;
        let outcome = tool.execute(tool_call.arguments.clone()).await;
        Some(outcome.into_tool_result(&tool_call.id, &tool_call.name))
    }

    /// Create a builder for fluent tool registration
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}

/// Builder for fluent registry construction
#[derive(Default)]
pub struct ToolRegistryBuilder {
    registry: ToolRegistry,
}

impl ToolRegistryBuilder {
    pub fn tool(mut self, tool: impl Tool + 'static) -> Self {
        self.registry.register(tool);
        self
    }

    pub fn build(self) -> ToolRegistry {
        self.registry
    }
}

// ============================================================================
// Built-in tools
// ============================================================================

/// Echoes back the provided message. Useful for smoke tests and demos.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo back the provided message"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message": { "type": "string", "description": "Message to echo" }
            },
            "required": ["message"]
        })
    }

    async fn execute(&self, arguments: Value) -> ToolExecutionResult {
        match arguments.get("message").and_then(|v| v.as_str()) {
            Some(message) => ToolExecutionResult::success(serde_json::json!({ "echoed": message })),
            None => ToolExecutionResult::tool_error("missing required argument: message"),
        }
    }
}

/// Returns the current date and time.
pub struct GetCurrentTimeTool;

#[async_trait]
impl Tool for GetCurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time in UTC"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: Value) -> ToolExecutionResult {
        ToolExecutionResult::success(serde_json::json!({
            "current_time": chrono::Utc::now().to_rfc3339()
        }))
    }
}
