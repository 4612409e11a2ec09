// Response streamer
//
// Runs the model/tool loop for one response and streams output chunks
// to the caller as they are produced. The loop is bounded by
// `max_steps` model round-trips; tools with registered handlers run
// inline, tools without handlers end the stream and stay pending for a
// later continuation pass.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::chunk::OutputChunk;
use crate::config::AgentConfig;
use crate::continuation::resolve_pending;
use crate::llm::{history_to_llm_messages, LlmCallConfig, LlmProvider, LlmStreamEvent};
use crate::schedule::{describe_schedule, NoSchedule, TaskSchedule};
use crate::tools::{ToolDefinition, ToolRegistry};
use crate::turn::Turn;

/// Why a stream ended
pub mod finish_reason {
    pub const STOP: &str = "stop";
    pub const MAX_STEPS: &str = "max_steps";
    pub const CANCELLED: &str = "cancelled";
    pub const PENDING_TOOL_CALLS: &str = "pending_tool_calls";
    pub const ERROR: &str = "error";
}

/// What one stream produced, handed to the finish callback
#[derive(Debug, Clone)]
pub struct StreamOutcome {
    /// Turns generated during the stream, in order. Callers persist
    /// these to the session history.
    pub turns: Vec<Turn>,
    /// One of the `finish_reason` constants
    pub reason: String,
}

/// Called exactly once when the stream finishes, on every path
/// including cancellation and errors.
pub type FinishCallback = Box<dyn FnOnce(StreamOutcome) + Send + 'static>;

/// Streams agent responses over a conversation history
#[derive(Clone)]
pub struct ResponseStreamer {
    provider: Arc<dyn LlmProvider>,
    registry: ToolRegistry,
    config: AgentConfig,
    schedule: Arc<dyn TaskSchedule>,
}

impl ResponseStreamer {
    pub fn new(provider: Arc<dyn LlmProvider>, config: AgentConfig) -> Self {
        Self {
            provider,
            registry: ToolRegistry::new(),
            config,
            schedule: Arc::new(NoSchedule),
        }
    }

    /// Set the tool registry
    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the scheduled-task source consulted at stream start
    pub fn with_schedule(mut self, schedule: Arc<dyn TaskSchedule>) -> Self {
        self.schedule = schedule;
        self
    }

    /// Tool definitions for the model: registered tools plus any
    /// declared-only definitions from the configuration.
    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions = self.registry.tool_definitions();
        for def in &self.config.tools {
            if !self.registry.has(&def.name) {
                definitions.push(def.clone());
            }
        }
        definitions
    }

    /// Start streaming a response over `history`.
    ///
    /// The returned stream yields chunks until a terminal chunk
    /// (`Completed` or `Error`). Cancelling the token stops the loop at
    /// the next await point; partial progress is still reported through
    /// `on_finish`.
    pub fn stream(
        &self,
        history: Vec<Turn>,
        cancel: CancellationToken,
        on_finish: FinishCallback,
    ) -> ReceiverStream<OutputChunk> {
        let (tx, rx) = mpsc::channel(64);
        let streamer = self.clone();

        tokio::spawn(async move {
            let outcome = streamer.run(history, cancel, &tx).await;
            info!(reason = %outcome.reason, turns = outcome.turns.len(), "Stream finished");
            on_finish(outcome);
        });

        ReceiverStream::new(rx)
    }

    async fn run(
        &self,
        history: Vec<Turn>,
        cancel: CancellationToken,
        tx: &mpsc::Sender<OutputChunk>,
    ) -> StreamOutcome {
        let mut produced: Vec<Turn> = Vec::new();

        // Resolve anything the last stream left unanswered
        let continuation = resolve_pending(history, &self.registry).await;
        let mut working = continuation.history;
        for turn in continuation.executed {
            for result in turn.tool_results_parts() {
                let _ = tx.send(OutputChunk::ToolResult(result.clone())).await;
            }
            produced.push(turn);
        }

        // The schedule snapshot is taken once per stream
        let tasks = self.schedule.snapshot().await;
        let system_prompt = format!("{}{}", self.config.system_prompt, describe_schedule(&tasks));

        let mut call_config = LlmCallConfig::from(&self.config);
        call_config.tools = self.tool_definitions();

        for step in 0..self.config.max_steps {
            debug!(step, "Model round-trip");

            let messages = history_to_llm_messages(&system_prompt, &working);
            let mut stream = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return self.finish(tx, produced, finish_reason::CANCELLED).await;
                }
                result = self.provider.chat_completion_stream(messages, &call_config) => {
                    match result {
                        Ok(stream) => stream,
                        Err(err) => {
                            error!(error = %err, "LLM call failed");
                            let _ = tx.send(OutputChunk::error(err.to_string())).await;
                            return StreamOutcome {
                                turns: produced,
                                reason: finish_reason::ERROR.to_string(),
                            };
                        }
                    }
                }
            };

            let mut text = String::new();
            let mut tool_calls = Vec::new();

            loop {
                let event = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        if !text.is_empty() {
                            produced.push(Turn::assistant(text));
                        }
                        return self.finish(tx, produced, finish_reason::CANCELLED).await;
                    }
                    event = stream.next() => event,
                };

                match event {
                    Some(Ok(LlmStreamEvent::TextDelta(delta))) => {
                        text.push_str(&delta);
                        if tx.send(OutputChunk::text_delta(delta)).await.is_err() {
                            // Receiver gone; treat like cancellation
                            if !text.is_empty() {
                                produced.push(Turn::assistant(text));
                            }
                            return StreamOutcome {
                                turns: produced,
                                reason: finish_reason::CANCELLED.to_string(),
                            };
                        }
                    }
                    Some(Ok(LlmStreamEvent::ToolCalls(calls))) => {
                        tool_calls = calls;
                    }
                    Some(Ok(LlmStreamEvent::Done(meta))) => {
                        debug!(finish_reason = ?meta.finish_reason, "Provider stream done");
                        break;
                    }
                    Some(Ok(LlmStreamEvent::Error(message))) | Some(Err(crate::error::PipelineError::Llm(message))) => {
                        error!(error = %message, "Provider stream error");
                        let _ = tx.send(OutputChunk::error(message)).await;
                        return StreamOutcome {
                            turns: produced,
                            reason: finish_reason::ERROR.to_string(),
                        };
                    }
                    Some(Err(err)) => {
                        error!(error = %err, "Provider stream error");
                        let _ = tx.send(OutputChunk::error(err.to_string())).await;
                        return StreamOutcome {
                            turns: produced,
                            reason: finish_reason::ERROR.to_string(),
                        };
                    }
                    None => break,
                }
            }

            if tool_calls.is_empty() {
                if !text.is_empty() {
                    let turn = Turn::assistant(text);
                    working.push(turn.clone());
                    produced.push(turn);
                }
                return self.finish(tx, produced, finish_reason::STOP).await;
            }

            let assistant = Turn::assistant_with_tools(text, tool_calls.clone());
            working.push(assistant.clone());
            produced.push(assistant);

            let mut results = Vec::new();
            let mut pending = false;
            for call in &tool_calls {
                let _ = tx.send(OutputChunk::ToolCall(call.clone())).await;
                match self.registry.execute_call(call).await {
                    Some(result) => {
                        let _ = tx.send(OutputChunk::ToolResult(result.clone())).await;
                        results.push(result);
                    }
                    None => {
                        // No handler; leave the call pending for a
                        // later continuation
                        warn!(tool = %call.name, "Tool call has no handler, stream pauses");
                        pending = true;
                    }
                }
            }

            if !results.is_empty() {
                let turn = Turn::tool_results(results);
                working.push(turn.clone());
                produced.push(turn);
            }

            if pending {
                return self
                    .finish(tx, produced, finish_reason::PENDING_TOOL_CALLS)
                    .await;
            }
        }

        warn!(max_steps = self.config.max_steps, "Stream hit step limit");
        self.finish(tx, produced, finish_reason::MAX_STEPS).await
    }

    async fn finish(
        &self,
        tx: &mpsc::Sender<OutputChunk>,
        turns: Vec<Turn>,
        reason: &str,
    ) -> StreamOutcome {
        let _ = tx.send(OutputChunk::completed(reason)).await;
        StreamOutcome {
            turns,
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Debug for ResponseStreamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStreamer")
            .field("model", &self.config.model)
            .field("max_steps", &self.config.max_steps)
            .field("tools", &self.registry.tool_names())
            .finish()
    }
}
