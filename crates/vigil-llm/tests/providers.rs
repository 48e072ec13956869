//! Provider HTTP behavior against a mock server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vigil_llm::{
    AnthropicProvider, ChatMessage, ChatOptions, OllamaProvider, OpenAiCompatConfig,
    OpenAiCompatProvider, Provider, ProviderError,
};

fn openai_provider(server: &MockServer) -> OpenAiCompatProvider {
    let config = OpenAiCompatConfig {
        name: "openai".into(),
        base_url: server.uri(),
        api_key_env: "UNUSED".into(),
        default_model: "gpt-4o-mini".into(),
    };
    OpenAiCompatProvider::with_api_key(config, "test-key")
}

fn openai_success_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}
    })
}

#[tokio::test]
async fn openai_chat_parses_completion_and_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_success_body("Hello!")))
        .mount(&server)
        .await;

    let provider = openai_provider(&server);
    let completion = provider
        .chat(&[ChatMessage::user("Hi")], &ChatOptions::default())
        .await
        .unwrap();

    assert_eq!(completion.text, "Hello!");
    assert_eq!(completion.stop_reason.as_deref(), Some("stop"));
    let usage = completion.usage.unwrap();
    assert_eq!(usage.input_tokens, 9);
    assert_eq!(usage.output_tokens, 3);
}

#[tokio::test]
async fn openai_401_maps_to_auth_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = openai_provider(&server)
        .chat(&[ChatMessage::user("Hi")], &ChatOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::AuthFailed(_)));
}

#[tokio::test]
async fn openai_429_maps_to_rate_limited_with_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "7")
                .set_body_string("slow down"),
        )
        .mount(&server)
        .await;

    let err = openai_provider(&server)
        .chat(&[ChatMessage::user("Hi")], &ChatOptions::default())
        .await
        .unwrap_err();
    match err {
        ProviderError::RateLimited { retry_after_ms } => assert_eq!(retry_after_ms, 7_000),
        other => panic!("expected RateLimited, got {other}"),
    }
}

#[tokio::test]
async fn openai_500_maps_to_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let err = openai_provider(&server)
        .chat(&[ChatMessage::user("Hi")], &ChatOptions::default())
        .await
        .unwrap_err();
    match err {
        ProviderError::ServerError { status, .. } => assert_eq!(status, 503),
        other => panic!("expected ServerError, got {other}"),
    }
}

#[tokio::test]
async fn openai_content_filter_stop_is_refused() {
    let server = MockServer::start().await;
    let body = json!({
        "id": "chatcmpl-2",
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": ""},
            "finish_reason": "content_filter"
        }],
        "usage": null
    });
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let err = openai_provider(&server)
        .chat(&[ChatMessage::user("Hi")], &ChatOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Refused { .. }));
}

#[tokio::test]
async fn anthropic_chat_speaks_messages_api() {
    let server = MockServer::start().await;
    let body = json!({
        "id": "msg-1",
        "content": [{"type": "text", "text": "Hi there"}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 11, "output_tokens": 5}
    });
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({"system": "be brief"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let provider = AnthropicProvider::with_api_key("test-key").base_url(server.uri());
    let opts = ChatOptions {
        system: Some("be brief".into()),
        ..ChatOptions::default()
    };
    let completion = provider
        .chat(&[ChatMessage::user("Hi")], &opts)
        .await
        .unwrap();

    assert_eq!(completion.text, "Hi there");
    assert_eq!(completion.stop_reason.as_deref(), Some("end_turn"));
    assert_eq!(completion.usage.unwrap().input_tokens, 11);
}

#[tokio::test]
async fn anthropic_refusal_stop_reason_is_refused() {
    let server = MockServer::start().await;
    let body = json!({
        "id": "msg-2",
        "content": [],
        "stop_reason": "refusal",
        "usage": {"input_tokens": 4, "output_tokens": 0}
    });
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let provider = AnthropicProvider::with_api_key("test-key").base_url(server.uri());
    let err = provider
        .chat(&[ChatMessage::user("Hi")], &ChatOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Refused { .. }));
}

#[tokio::test]
async fn ollama_chat_parses_native_reply() {
    let server = MockServer::start().await;
    let body = json!({
        "model": "llama3.2",
        "message": {"role": "assistant", "content": "Local hello"},
        "done": true,
        "done_reason": "stop",
        "prompt_eval_count": 20,
        "eval_count": 6
    });
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new().base_url(server.uri());
    let completion = provider
        .chat(&[ChatMessage::user("Hi")], &ChatOptions::default())
        .await
        .unwrap();

    assert_eq!(completion.text, "Local hello");
    let usage = completion.usage.unwrap();
    assert_eq!(usage.input_tokens, 20);
    assert_eq!(usage.output_tokens, 6);
}

#[tokio::test]
async fn ollama_missing_model_maps_to_model_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model not pulled"))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new().base_url(server.uri());
    let err = provider
        .chat(&[ChatMessage::user("Hi")], &ChatOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::ModelNotFound(_)));
}
