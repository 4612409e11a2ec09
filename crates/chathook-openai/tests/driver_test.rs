// Driver tests against a mocked chat completions endpoint.

use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chathook_core::{LlmCallConfig, LlmProvider, LlmStreamEvent, ToolDefinition, ToolPolicy};
use chathook_openai::OpenAiDriver;

fn sse_body(events: &[&str]) -> String {
    let mut body = String::new();
    for event in events {
        body.push_str("data: ");
        body.push_str(event);
        body.push_str("\n\n");
    }
    body
}

fn call_config() -> LlmCallConfig {
    LlmCallConfig {
        model: "gpt-4o".to_string(),
        temperature: None,
        max_tokens: None,
        tools: Vec::new(),
    }
}

async fn mock_completions(server: &MockServer, body: String) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

fn driver_for(server: &MockServer) -> OpenAiDriver {
    OpenAiDriver::with_base_url(
        "test-key",
        format!("{}/v1/chat/completions", server.uri()),
    )
}

#[tokio::test]
async fn text_deltas_stream_through() {
    let server = MockServer::start().await;
    mock_completions(
        &server,
        sse_body(&[
            r#"{"choices":[{"delta":{"content":"Hel"}}]}"#,
            r#"{"choices":[{"delta":{"content":"lo"}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
            "[DONE]",
        ]),
    )
    .await;

    let driver = driver_for(&server);
    let response = driver
        .chat_completion(
            vec![chathook_core::LlmMessage::system("hi")],
            &call_config(),
        )
        .await
        .unwrap();

    assert_eq!(response.text, "Hello");
    assert!(response.tool_calls.is_none());
    assert_eq!(response.metadata.finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn tool_call_fragments_reassemble_by_index() {
    let server = MockServer::start().await;
    mock_completions(
        &server,
        sse_body(&[
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"echo","arguments":""}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"mess"}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"age\":\"hi\"}"}}]}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#,
            "[DONE]",
        ]),
    )
    .await;

    let driver = driver_for(&server);
    let mut stream = driver
        .chat_completion_stream(
            vec![chathook_core::LlmMessage::system("hi")],
            &call_config(),
        )
        .await
        .unwrap();

    let mut tool_calls = None;
    while let Some(event) = stream.next().await {
        if let LlmStreamEvent::ToolCalls(calls) = event.unwrap() {
            tool_calls = Some(calls);
        }
    }

    let calls = tool_calls.expect("tool calls event");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "call_1");
    assert_eq!(calls[0].name, "echo");
    assert_eq!(calls[0].arguments, json!({"message": "hi"}));
}

#[tokio::test]
async fn api_error_surfaces_as_llm_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    let driver = driver_for(&server);
    let err = match driver
        .chat_completion_stream(
            vec![chathook_core::LlmMessage::system("hi")],
            &call_config(),
        )
        .await
    {
        Ok(_) => panic!("expected error"),
        Err(err) => err,
    };

    let message = err.to_string();
    assert!(message.contains("401"));
}

#[tokio::test]
async fn tools_are_sent_in_function_format() {
    let server = MockServer::start().await;
    mock_completions(
        &server,
        sse_body(&[
            r#"{"choices":[{"delta":{"content":"ok"}}]}"#,
            "[DONE]",
        ]),
    )
    .await;

    let driver = driver_for(&server);
    let mut config = call_config();
    config.tools = vec![ToolDefinition {
        name: "echo".to_string(),
        description: "Echo back".to_string(),
        parameters: json!({"type": "object", "properties": {}}),
        policy: ToolPolicy::Auto,
    }];

    driver
        .chat_completion(
            vec![chathook_core::LlmMessage::system("hi")],
            &config,
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["stream"], true);
    assert_eq!(body["tools"][0]["type"], "function");
    assert_eq!(body["tools"][0]["function"]["name"], "echo");
}
