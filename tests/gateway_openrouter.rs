//! OpenRouter adapter tests against a local wiremock server.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tripartite::gateway::openrouter::{ChatProvider, OpenRouterAdapter};
use tripartite::gateway::{
    Attribution, ChatModel, ChatRequest, FinishReason, Message, NoopUsageSink, ProviderError,
    ProviderGateway,
};
use tripartite::ChatGateway;

fn adapter(server: &MockServer) -> OpenRouterAdapter {
    OpenRouterAdapter::with_config(
        "sk-test",
        server.uri(),
        Duration::from_secs(5),
        None,
        None,
    )
    .unwrap()
}

fn request(model: &str) -> ChatRequest {
    ChatRequest::new(
        ChatModel::openrouter(model),
        vec![
            Message::system("You are a research assistant."),
            Message::user("Summarize competitor pricing."),
        ],
        Attribution::new("test"),
    )
    .temperature(0.3)
    .max_tokens(512)
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "choices": [{
            "message": { "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 1000, "completion_tokens": 1000 }
    })
}

#[tokio::test]
async fn happy_path_parses_content_usage_and_cost() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Answer text.")))
        .expect(1)
        .mount(&server)
        .await;

    let resp = adapter(&server)
        .chat(&request("openai/gpt-4o-mini"))
        .await
        .unwrap();

    assert_eq!(resp.content, "Answer text.");
    assert_eq!(resp.input_tokens, 1000);
    assert_eq!(resp.output_tokens, 1000);
    assert_eq!(resp.total_tokens(), 2000);
    // gpt-4o-mini: 150 + 600 nanodollars per token at 1k/1k
    assert_eq!(resp.cost_nanodollars, 750_000);
    assert_eq!(resp.finish_reason, FinishReason::Stop);
    // No web search requested, so no web data even if the provider sent any.
    assert!(resp.web.is_none());
}

#[tokio::test]
async fn web_search_sends_plugin_and_collects_citations() {
    let server = MockServer::start().await;

    // Matcher only fires when the web plugin is attached to the request.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "plugins": [{ "id": "web" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "content": "Findings with citations.",
                    "annotations": [
                        { "type": "url_citation",
                          "url_citation": { "url": "https://example.com/a" } },
                        { "type": "url_citation",
                          "url_citation": { "url": "https://example.com/b" } }
                    ]
                },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 50, "completion_tokens": 200 },
            "citations": ["https://example.com/a", "https://example.com/c"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = adapter(&server)
        .chat(&request("perplexity/sonar").with_web_search())
        .await
        .unwrap();

    let web = resp.web.unwrap();
    // Top-level citations first, annotation URLs appended deduplicated.
    assert_eq!(
        web.sources,
        vec![
            "https://example.com/a",
            "https://example.com/c",
            "https://example.com/b",
        ]
    );
    assert!((web.confidence - 0.6).abs() < 1e-9);
}

#[tokio::test]
async fn http_429_maps_to_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "rate limit exceeded", "code": "rate_limit_exceeded" }
        })))
        .mount(&server)
        .await;

    let err = adapter(&server)
        .chat(&request("openai/gpt-4o-mini"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::RateLimited { .. }));
    assert!(err.is_retryable());
    assert_eq!(
        err.context().and_then(|c| c.provider_code.as_deref()),
        Some("rate_limit_exceeded")
    );
}

#[tokio::test]
async fn http_500_maps_to_retryable_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "message": "upstream exploded" }
        })))
        .mount(&server)
        .await;

    let err = adapter(&server)
        .chat(&request("openai/gpt-4o-mini"))
        .await
        .unwrap_err();

    match err {
        ProviderError::Provider {
            retryable, message, ..
        } => {
            assert!(retryable);
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("expected Provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn refusal_content_maps_to_refused() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("I cannot help with that request.")),
        )
        .mount(&server)
        .await;

    let err = adapter(&server)
        .chat(&request("openai/gpt-4o-mini"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Refused { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn missing_usage_is_a_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "content": "text" },
                "finish_reason": "stop"
            }]
        })))
        .mount(&server)
        .await;

    let err = adapter(&server)
        .chat(&request("openai/gpt-4o-mini"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Provider { .. }));
}

#[tokio::test]
async fn provider_gateway_forwards_through_adapter() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("gateway ok")))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = ProviderGateway::with_adapter(adapter(&server), Arc::new(NoopUsageSink));
    let resp = ChatGateway::chat(&gateway, request("openai/gpt-4o-mini"))
        .await
        .unwrap();

    assert_eq!(resp.content, "gateway ok");
}
