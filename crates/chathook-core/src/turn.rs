// Conversation turn types
//
// A Turn is one exchange unit in a chat session: a role plus an ordered
// sequence of content parts. Turns are immutable once appended; history
// is owned by the session and persists for its lifetime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::tools::{ToolCall, ToolResult};

/// Turn role in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// User message
    User,
    /// Assistant response (text and/or tool calls)
    Assistant,
    /// Tool execution results
    Tool,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
            TurnRole::Tool => write!(f, "tool"),
        }
    }
}

impl From<&str> for TurnRole {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "assistant" => TurnRole::Assistant,
            "tool" => TurnRole::Tool,
            _ => TurnRole::User,
        }
    }
}

/// One content part within a turn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text
    Text { text: String },
    /// A tool invocation requested by the assistant
    ToolCall(ToolCall),
    /// The result of a tool invocation
    ToolResult(ToolResult),
}

/// A turn in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Turn {
    /// Unique turn ID
    pub id: Uuid,

    /// Turn role
    pub role: TurnRole,

    /// Ordered content parts (text, tool calls, tool results)
    pub content: Vec<ContentPart>,

    /// When the turn was created
    pub created_at: DateTime<Utc>,
}

impl Turn {
    fn new(role: TurnRole, content: Vec<ContentPart>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            content,
            created_at: Utc::now(),
        }
    }

    /// Create a user turn with text content
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(TurnRole::User, vec![ContentPart::Text { text: text.into() }])
    }

    /// Create an assistant turn with text content
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(
            TurnRole::Assistant,
            vec![ContentPart::Text { text: text.into() }],
        )
    }

    /// Create an assistant turn with text and tool calls
    pub fn assistant_with_tools(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let text = text.into();
        let mut content = Vec::with_capacity(tool_calls.len() + 1);
        if !text.is_empty() {
            content.push(ContentPart::Text { text });
        }
        content.extend(tool_calls.into_iter().map(ContentPart::ToolCall));
        Self::new(TurnRole::Assistant, content)
    }

    /// Create a tool turn carrying execution results
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self::new(
            TurnRole::Tool,
            results.into_iter().map(ContentPart::ToolResult).collect(),
        )
    }

    /// Create a synthesized user turn describing a scheduled task execution
    pub fn task(description: impl Into<String>) -> Self {
        Self::user(format!("Scheduled task triggered: {}", description.into()))
    }

    /// Concatenated text content, if any
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Tool calls contained in this turn
    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolCall(tc) => Some(tc),
                _ => None,
            })
            .collect()
    }

    /// Tool results contained in this turn
    pub fn tool_results_parts(&self) -> Vec<&ToolResult> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolResult(tr) => Some(tr),
                _ => None,
            })
            .collect()
    }

    /// Check if this turn requests any tool calls
    pub fn has_tool_calls(&self) -> bool {
        self.content
            .iter()
            .any(|part| matches!(part, ContentPart::ToolCall(_)))
    }
}
