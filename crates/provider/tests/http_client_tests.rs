//! HTTP-level tests for the provider adapters against a local mock server

use mcpbot_provider::{
    CompletionClient, FinishReason, Message, OllamaClient, OpenAiCompatibleClient,
    ProviderError, ToolDescriptor,
};
use mockito::Matcher;
use serde_json::json;

fn tools() -> Vec<ToolDescriptor> {
    vec![ToolDescriptor::new(
        "list_pods",
        "List pods in a namespace",
        json!({"type": "object", "properties": {"namespace": {"type": "string"}}}),
    )]
}

#[tokio::test]
async fn test_openai_sends_auth_and_tools() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(json!({
            "model": "deepseek-chat",
            "tool_choice": "auto",
            "tools": [{"type": "function", "function": {"name": "list_pods"}}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "c1",
                            "type": "function",
                            "function": {"name": "list_pods", "arguments": "{}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = OpenAiCompatibleClient::new("sk-test", server.url(), "deepseek-chat");
    let result = client
        .complete(&[Message::user("list pods")], &tools())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.finish_reason, FinishReason::ToolCalls);
    assert_eq!(result.message.tool_calls[0].id, "c1");
    assert_eq!(result.message.tool_calls[0].raw_arguments, "{}");
}

#[tokio::test]
async fn test_openai_api_error_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": {"message": "Authentication Fails"}}"#)
        .create_async()
        .await;

    let client = OpenAiCompatibleClient::new("bad", server.url(), "deepseek-chat");
    let err = client.complete(&[Message::user("hi")], &[]).await.unwrap_err();

    match err {
        ProviderError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Authentication Fails");
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_openai_rate_limit() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body("slow down")
        .create_async()
        .await;

    let client = OpenAiCompatibleClient::new("sk", server.url(), "m");
    let err = client.complete(&[], &[]).await.unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited));
}

#[tokio::test]
async fn test_openai_non_json_success_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body("<html>proxy page</html>")
        .create_async()
        .await;

    let client = OpenAiCompatibleClient::new("sk", server.url(), "m");
    let err = client.complete(&[], &[]).await.unwrap_err();
    assert!(matches!(err, ProviderError::Json(_)));
}

#[tokio::test]
async fn test_ollama_chat_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({"model": "llama3.1", "stream": false})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "model": "llama3.1",
                "message": {"role": "assistant", "content": "There are two pods."},
                "done": true,
                "done_reason": "stop"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = OllamaClient::new(server.url(), "llama3.1");
    let result = client
        .complete(&[Message::user("how many pods?")], &tools())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.finish_reason, FinishReason::Stop);
    assert_eq!(result.message.content, "There are two pods.");
}

#[tokio::test]
async fn test_ollama_model_not_found() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/chat")
        .with_status(404)
        .with_body(r#"{"error": "model \"llama9\" not found"}"#)
        .create_async()
        .await;

    let client = OllamaClient::new(server.url(), "llama9");
    let err = client.complete(&[], &[]).await.unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_request_error() {
    // Port 9 (discard) is closed on test machines
    let client = OpenAiCompatibleClient::new("sk", "http://127.0.0.1:9", "m");
    let err = client.complete(&[], &[]).await.unwrap_err();
    assert!(matches!(err, ProviderError::Request(_)));
}
