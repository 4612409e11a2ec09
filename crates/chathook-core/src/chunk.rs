// Output chunks streamed to clients
//
// These are the wire frames of the response stream. Each chunk is
// serialized as one tagged JSON object; the HTTP layer wraps them in
// SSE events without inspecting them.

use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::tools::{ToolCall, ToolResult};

/// One frame of a streamed response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputChunk {
    /// Incremental assistant text
    TextDelta { delta: String },
    /// The assistant requested a tool invocation
    ToolCall(ToolCall),
    /// A tool invocation finished
    ToolResult(ToolResult),
    /// The stream finished normally
    Completed {
        /// Why the stream ended ("stop", "max_steps", "cancelled")
        reason: String,
    },
    /// The stream failed; no further chunks follow
    Error { message: String },
}

impl OutputChunk {
    pub fn text_delta(delta: impl Into<String>) -> Self {
        OutputChunk::TextDelta {
            delta: delta.into(),
        }
    }

    pub fn completed(reason: impl Into<String>) -> Self {
        OutputChunk::Completed {
            reason: reason.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        OutputChunk::Error {
            message: message.into(),
        }
    }

    /// Whether this chunk terminates the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, OutputChunk::Completed { .. } | OutputChunk::Error { .. })
    }

    /// SSE event name, mirrors the serde tag
    pub fn event_name(&self) -> &'static str {
        match self {
            OutputChunk::TextDelta { .. } => "text_delta",
            OutputChunk::ToolCall(_) => "tool_call",
            OutputChunk::ToolResult(_) => "tool_result",
            OutputChunk::Completed { .. } => "completed",
            OutputChunk::Error { .. } => "error",
        }
    }
}
