//! Test fixtures and sample data for integration tests

use gateway_core::{
    AuthScheme, Capabilities, ChatMessage, Choice, FinishReason, GatewayRequest,
    GatewayResponse, Limits, MessageContent, MessageRole, NewAuthConfig, NewEndpoint, NewModel,
    NewProvider, Pricing, ProviderId, ResponseMessage, Usage,
};
use secrecy::SecretString;
use serde_json::{json, Value};

/// Credential every fixture provider authenticates with
pub const TEST_API_KEY: &str = "sk-integration";

/// Endpoint name registered on fixture providers
pub const CHAT_ENDPOINT: &str = "chat";

/// Endpoint path registered on fixture providers
pub const CHAT_PATH: &str = "/v1/chat/completions";

/// Request template for an OpenAI-style upstream
pub const OPENAI_REQUEST_TEMPLATE: &str =
    r#"{"model": "{{model_key}}", "messages": {{json messages}}, "stream": {{stream}} }"#;

/// Response template for an OpenAI-style upstream
pub const OPENAI_RESPONSE_TEMPLATE: &str =
    r#"{"model": {{json model}}, "provider": "openai-compatible", "choices": {{json choices}} }"#;

/// Template that forwards its input unchanged
pub const IDENTITY: &str = "{{json this}}";

/// Provider input pointed at `base_url`
pub fn new_provider(base_url: &str, request_template: &str, response_template: &str) -> NewProvider {
    NewProvider {
        id: None,
        name: "openai-compatible".to_string(),
        base_url: base_url.to_string(),
        auth: NewAuthConfig {
            scheme: AuthScheme::Bearer,
            header: "Authorization".to_string(),
            prefix: Some("Bearer".to_string()),
            credential: SecretString::new(TEST_API_KEY.to_string()),
        },
        headers: [("x-tenant".to_string(), "integration".to_string())].into(),
        request_template: request_template.to_string(),
        response_template: response_template.to_string(),
    }
}

/// A model keyed `key`
pub fn new_model(key: &str, streaming: bool) -> NewModel {
    NewModel {
        name: key.to_uppercase(),
        key: key.to_string(),
        description: String::new(),
        capabilities: Capabilities {
            function_calling: false,
            streaming,
        },
        limits: Limits::default(),
        pricing: Pricing::default(),
    }
}

/// The chat endpoint
pub fn chat_endpoint() -> NewEndpoint {
    NewEndpoint {
        name: CHAT_ENDPOINT.to_string(),
        path: CHAT_PATH.to_string(),
    }
}

/// Admin API body creating an OpenAI-style provider
pub fn provider_json(base_url: &str) -> Value {
    json!({
        "name": "openai-compatible",
        "base_url": base_url,
        "auth": {
            "type": "bearer",
            "header": "Authorization",
            "prefix": "Bearer",
            "credential": TEST_API_KEY
        },
        "request_template": OPENAI_REQUEST_TEMPLATE,
        "response_template": OPENAI_RESPONSE_TEMPLATE
    })
}

/// A one-message request for `model_key` on the chat endpoint
pub fn chat_request(provider_id: ProviderId, model_key: &str) -> GatewayRequest {
    GatewayRequest::builder(provider_id)
        .endpoint(CHAT_ENDPOINT)
        .model_key(model_key)
        .message(ChatMessage::system("Answer briefly."))
        .message(ChatMessage::user("What is the capital of France?"))
        .build()
        .expect("valid request")
}

/// Canonical response a pass-through upstream would echo
pub fn canonical_response(text: &str) -> GatewayResponse {
    GatewayResponse {
        model: "large".to_string(),
        provider: "echo".to_string(),
        choices: vec![Choice {
            index: 0,
            message: ResponseMessage {
                role: Some(MessageRole::Assistant),
                content: MessageContent::Text(text.to_string()),
                tool_calls: Vec::new(),
            },
            finish_reason: Some(FinishReason::Stop),
            ..Choice::default()
        }],
        usage: Usage {
            prompt_tokens: 12,
            completion_tokens: 3,
            total_tokens: 15,
        },
        ..GatewayResponse::default()
    }
}

/// Buffered completion in the OpenAI wire format
pub fn openai_completion(text: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "gpt-upstream",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
    })
}

/// One streamed chunk in the OpenAI wire format
pub fn openai_chunk(text: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion.chunk",
        "model": "gpt-upstream",
        "choices": [{ "index": 0, "delta": { "content": text }, "finish_reason": null }]
    })
}

/// Server-sent event body from raw frame payloads, optionally terminated
pub fn sse_body<I, S>(payloads: I, done: bool) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut body = String::new();
    for payload in payloads {
        body.push_str("data: ");
        body.push_str(payload.as_ref());
        body.push_str("\n\n");
    }
    if done {
        body.push_str("data: [DONE]\n\n");
    }
    body
}
