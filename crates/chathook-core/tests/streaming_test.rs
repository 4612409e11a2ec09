// End-to-end tests for the response streamer against the mock provider.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::json;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use chathook_core::{
    finish_reason, AgentConfig, EchoTool, InMemoryTaskSchedule, MockLlmProvider, MockLlmResponse,
    OutputChunk, ResponseStreamer, ScheduledTask, StreamOutcome, ToolCall, ToolRegistry, Turn,
    TurnRole,
};

fn streamer(provider: MockLlmProvider, config: AgentConfig) -> ResponseStreamer {
    ResponseStreamer::new(Arc::new(provider), config)
        .with_registry(ToolRegistry::builder().tool(EchoTool).build())
}

async fn collect(
    streamer: &ResponseStreamer,
    history: Vec<Turn>,
) -> (Vec<OutputChunk>, StreamOutcome) {
    let (tx, rx) = oneshot::channel();
    let stream = streamer.stream(
        history,
        CancellationToken::new(),
        Box::new(move |outcome| {
            let _ = tx.send(outcome);
        }),
    );
    let chunks = stream.collect::<Vec<_>>().await;
    let outcome = rx.await.unwrap();
    (chunks, outcome)
}

#[tokio::test]
async fn plain_text_response_streams_and_completes() {
    let provider = MockLlmProvider::new();
    provider
        .add_response(MockLlmResponse::text("Hello there"))
        .await;

    let streamer = streamer(provider, AgentConfig::new("You are helpful.", "mock"));
    let (chunks, outcome) = collect(&streamer, vec![Turn::user("hi")]).await;

    assert!(matches!(&chunks[0], OutputChunk::TextDelta { delta } if delta == "Hello there"));
    assert!(matches!(
        chunks.last().unwrap(),
        OutputChunk::Completed { reason } if reason == finish_reason::STOP
    ));

    assert_eq!(outcome.reason, finish_reason::STOP);
    assert_eq!(outcome.turns.len(), 1);
    assert_eq!(outcome.turns[0].role, TurnRole::Assistant);
    assert_eq!(outcome.turns[0].text().as_deref(), Some("Hello there"));
}

#[tokio::test]
async fn tool_round_trip_produces_call_result_and_final_text() {
    let provider = MockLlmProvider::new();
    provider
        .add_response(MockLlmResponse::tool_calls(vec![ToolCall {
            id: "call_1".to_string(),
            name: "echo".to_string(),
            arguments: json!({"message": "ping"}),
        }]))
        .await;
    provider
        .add_response(MockLlmResponse::text("The echo said ping."))
        .await;

    let streamer = streamer(provider, AgentConfig::new("You are helpful.", "mock"));
    let (chunks, outcome) = collect(&streamer, vec![Turn::user("echo ping")]).await;

    let saw_call = chunks
        .iter()
        .any(|c| matches!(c, OutputChunk::ToolCall(tc) if tc.name == "echo"));
    let saw_result = chunks
        .iter()
        .any(|c| matches!(c, OutputChunk::ToolResult(tr) if tr.tool_call_id == "call_1"));
    assert!(saw_call);
    assert!(saw_result);

    assert_eq!(outcome.reason, finish_reason::STOP);
    // assistant(tool call) + tool results + assistant(text)
    assert_eq!(outcome.turns.len(), 3);
    assert_eq!(outcome.turns[2].text().as_deref(), Some("The echo said ping."));
}

#[tokio::test]
async fn step_limit_terminates_a_looping_model() {
    let provider = MockLlmProvider::new();
    // A single queued tool-call response repeats forever
    provider
        .add_response(MockLlmResponse::tool_calls(vec![ToolCall {
            id: "call_loop".to_string(),
            name: "echo".to_string(),
            arguments: json!({"message": "again"}),
        }]))
        .await;
    let call_counter = provider.clone();

    let config = AgentConfig::new("You are helpful.", "mock").with_max_steps(3);
    let streamer = streamer(provider, config);
    let (chunks, outcome) = collect(&streamer, vec![Turn::user("loop")]).await;

    assert_eq!(outcome.reason, finish_reason::MAX_STEPS);
    assert!(matches!(
        chunks.last().unwrap(),
        OutputChunk::Completed { reason } if reason == finish_reason::MAX_STEPS
    ));
    assert_eq!(call_counter.call_count().await, 3);
}

#[tokio::test]
async fn unhandled_tool_call_pauses_the_stream() {
    let provider = MockLlmProvider::new();
    provider
        .add_response(MockLlmResponse::tool_calls(vec![ToolCall {
            id: "call_1".to_string(),
            name: "approve_payment".to_string(),
            arguments: json!({"amount": 100}),
        }]))
        .await;

    let streamer = streamer(provider, AgentConfig::new("You are helpful.", "mock"));
    let (chunks, outcome) = collect(&streamer, vec![Turn::user("pay")]).await;

    assert_eq!(outcome.reason, finish_reason::PENDING_TOOL_CALLS);
    assert!(matches!(
        chunks.last().unwrap(),
        OutputChunk::Completed { reason } if reason == finish_reason::PENDING_TOOL_CALLS
    ));
    // The pending call is persisted so a later continuation can see it
    assert_eq!(outcome.turns.len(), 1);
    assert!(outcome.turns[0].has_tool_calls());
}

#[tokio::test]
async fn provider_stream_error_ends_with_an_error_chunk() {
    let provider = MockLlmProvider::new();
    provider
        .add_response(MockLlmResponse::error("upstream unavailable"))
        .await;

    let streamer = streamer(provider, AgentConfig::new("You are helpful.", "mock"));
    let (chunks, outcome) = collect(&streamer, vec![Turn::user("hi")]).await;

    // The error chunk is terminal; no Completed follows it
    assert!(matches!(
        chunks.last().unwrap(),
        OutputChunk::Error { message } if message == "upstream unavailable"
    ));
    assert_eq!(outcome.reason, finish_reason::ERROR);
    assert!(outcome.turns.is_empty());
}

#[tokio::test]
async fn cancellation_stops_the_loop_and_still_reports() {
    let provider = MockLlmProvider::new();
    provider
        .add_response(MockLlmResponse::text("never delivered"))
        .await;

    let streamer = streamer(provider, AgentConfig::new("You are helpful.", "mock"));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (tx, rx) = oneshot::channel();
    let stream = streamer.stream(
        vec![Turn::user("hi")],
        cancel,
        Box::new(move |outcome| {
            let _ = tx.send(outcome);
        }),
    );
    let chunks = stream.collect::<Vec<_>>().await;
    let outcome = rx.await.unwrap();

    assert_eq!(outcome.reason, finish_reason::CANCELLED);
    assert!(matches!(
        chunks.last().unwrap(),
        OutputChunk::Completed { reason } if reason == finish_reason::CANCELLED
    ));
}

#[tokio::test]
async fn schedule_snapshot_lands_in_the_system_prompt() {
    let provider = MockLlmProvider::new();
    provider.add_response(MockLlmResponse::text("ok")).await;
    let call_log = provider.clone();

    let schedule = InMemoryTaskSchedule::new();
    schedule.add(ScheduledTask::new("send weekly digest")).await;

    let streamer = ResponseStreamer::new(
        Arc::new(provider),
        AgentConfig::new("You are helpful.", "mock"),
    )
    .with_schedule(Arc::new(schedule));

    let (_chunks, _outcome) = {
        let (tx, rx) = oneshot::channel();
        let stream = streamer.stream(
            vec![Turn::user("hi")],
            CancellationToken::new(),
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
        );
        (stream.collect::<Vec<_>>().await, rx.await.unwrap())
    };

    let calls = call_log.calls().await;
    let system = &calls[0][0];
    assert!(system.content.contains("You are helpful."));
    assert!(system.content.contains("send weekly digest"));
}

#[tokio::test]
async fn dangling_call_is_resolved_before_the_model_runs() {
    let provider = MockLlmProvider::new();
    provider.add_response(MockLlmResponse::text("done")).await;
    let call_log = provider.clone();

    let history = vec![
        Turn::user("echo hi"),
        Turn::assistant_with_tools(
            "",
            vec![ToolCall {
                id: "call_old".to_string(),
                name: "echo".to_string(),
                arguments: json!({"message": "hi"}),
            }],
        ),
    ];

    let streamer = streamer(provider, AgentConfig::new("You are helpful.", "mock"));
    let (chunks, outcome) = collect(&streamer, history).await;

    // The pending call ran before the model call and its result turn is reported
    assert!(chunks
        .iter()
        .any(|c| matches!(c, OutputChunk::ToolResult(tr) if tr.tool_call_id == "call_old")));
    assert!(outcome
        .turns
        .iter()
        .any(|t| t.role == TurnRole::Tool));

    // The model saw the answered call, not a dangling one
    let calls = call_log.calls().await;
    let submitted = &calls[0];
    assert!(submitted
        .iter()
        .any(|m| m.tool_call_id.as_deref() == Some("call_old")));
}
