// Pending tool-call resolution
//
// A history may end with an assistant turn whose tool calls were never
// answered (the process crashed mid-stream, or a call awaits a decision
// that has no execution handler). Providers reject such histories, so
// before the next model call every unresolved call is either executed
// now (handler registered) or stripped from the submitted view
// (no handler). Stripping only affects what the model sees; the stored
// history is untouched.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::tools::{ToolRegistry, ToolResult};
use crate::turn::{ContentPart, Turn};

/// Result of the continuation pass
#[derive(Debug, Clone, Default)]
pub struct ContinuationOutcome {
    /// History as it will be submitted to the model
    pub history: Vec<Turn>,
    /// Tool turns created by executing pending calls. Callers persist
    /// these so the stored history catches up with the submitted one.
    pub executed: Vec<Turn>,
}

/// Resolve every unanswered tool call in `history`.
pub async fn resolve_pending(history: Vec<Turn>, registry: &ToolRegistry) -> ContinuationOutcome {
    let answered: HashSet<String> = history
        .iter()
        .flat_map(|turn| turn.tool_results_parts())
        .map(|tr| tr.tool_call_id.clone())
        .collect();

    let has_pending = history
        .iter()
        .flat_map(|turn| turn.tool_calls())
        .any(|tc| !answered.contains(&tc.id));
    if !has_pending {
        return ContinuationOutcome {
            history,
            executed: Vec::new(),
        };
    }

    let mut executed: Vec<Turn> = Vec::new();
    let mut submitted: Vec<Turn> = Vec::with_capacity(history.len());

    for turn in history {
        if !turn.has_tool_calls() {
            submitted.push(turn);
            continue;
        }

        let mut kept = turn;
        let mut parts = Vec::with_capacity(kept.content.len());
        let mut resolved: Vec<ToolResult> = Vec::new();
        for part in kept.content {
            match part {
                ContentPart::ToolCall(call) if !answered.contains(&call.id) => {
                    match registry.execute_call(&call).await {
                        Some(result) => {
                            info!(tool = %call.name, tool_call_id = %call.id, "Executed pending tool call");
                            resolved.push(result);
                            parts.push(ContentPart::ToolCall(call));
                        }
                        None => {
                            // No handler; the model never learns the call existed
                            warn!(tool = %call.name, tool_call_id = %call.id, "Stripping dangling tool call with no handler");
                        }
                    }
                }
                part => parts.push(part),
            }
        }
        kept.content = parts;
        if !kept.content.is_empty() {
            submitted.push(kept);
        }
        // Tool results must sit directly after the turn carrying
        // their calls or the provider rejects the history
        if !resolved.is_empty() {
            let tool_turn = Turn::tool_results(resolved);
            submitted.push(tool_turn.clone());
            executed.push(tool_turn);
        }
    }

    ContinuationOutcome {
        history: submitted,
        executed,
    }
}
