//! HTTP ingress and administration API, end to end

use crate::fixtures::*;
use crate::helpers::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn proxy_body(provider_id: &str, stream: bool) -> Value {
    json!({
        "provider_id": provider_id,
        "endpoint": "chat",
        "model_key": "large",
        "stream": stream,
        "messages": [{ "role": "user", "content": "What is the capital of France?" }]
    })
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;
    let response = server.get("/health").await;
    assert_status(&response, 200);
    assert_eq!(TestServer::json_body(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_proxy_buffered() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("Paris.")))
        .expect(1)
        .mount(&upstream)
        .await;

    let server = TestServer::start().await;
    let id = server.register_provider(&provider_json(&upstream.uri()), false).await;

    let response = server.post_json("/v1/proxy", &proxy_body(&id, false)).await;
    assert_status(&response, 200);

    let body = TestServer::json_body(response).await;
    assert_eq!(body["provider"], "openai-compatible");
    assert_eq!(body["choices"][0]["message"]["content"], "Paris.");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
}

#[tokio::test]
async fn test_proxy_streaming_relays_events_then_done() {
    let upstream = MockServer::start().await;
    let frames = ["Par", "is"].map(|t| openai_chunk(t).to_string());
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(frames, true)),
        )
        .mount(&upstream)
        .await;

    let server = TestServer::start().await;
    let id = server.register_provider(&provider_json(&upstream.uri()), true).await;

    let response = server.post_json("/v1/proxy", &proxy_body(&id, true)).await;
    assert_status(&response, 200);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let body = response.text().await.unwrap();
    let data = sse_data(&body);
    assert_eq!(data.len(), 3);
    assert_eq!(data[2], "[DONE]");

    let first: Value = serde_json::from_str(&data[0]).unwrap();
    assert_eq!(first["choices"][0]["delta"]["content"], "Par");
}

#[tokio::test]
async fn test_proxy_streaming_unsupported_is_422() {
    let upstream = MockServer::start().await;
    let server = TestServer::start().await;
    let id = server.register_provider(&provider_json(&upstream.uri()), false).await;

    let response = server.post_json("/v1/proxy", &proxy_body(&id, true)).await;
    assert_status(&response, 422);
    let body = TestServer::json_body(response).await;
    assert_eq!(body["error"]["code"], "streaming_unsupported");
}

#[tokio::test]
async fn test_proxy_upstream_failure_is_502() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&upstream)
        .await;

    let server = TestServer::start().await;
    let id = server.register_provider(&provider_json(&upstream.uri()), false).await;

    let response = server.post_json("/v1/proxy", &proxy_body(&id, false)).await;
    assert_status(&response, 502);

    let body = TestServer::json_body(response).await;
    assert_eq!(body["error"]["code"], "upstream_500");
    assert_eq!(body["error"]["type"], "upstream_error");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("upstream exploded"));
}

#[tokio::test]
async fn test_proxy_rejects_malformed_json() {
    let server = TestServer::start().await;
    let response = server
        .client
        .post(server.url("/v1/proxy"))
        .header("content-type", "application/json")
        .body("{\"provider_id\": ")
        .send()
        .await
        .unwrap();
    assert_status(&response, 400);
}

#[tokio::test]
async fn test_admin_duplicate_model_is_conflict() {
    let server = TestServer::start().await;
    let id = server
        .register_provider(&provider_json("http://127.0.0.1:9"), false)
        .await;

    let response = server
        .post_json(
            &format!("/admin/providers/{id}/models"),
            &json!([{ "name": "Large again", "key": "large" }]),
        )
        .await;
    assert_status(&response, 409);

    let provider = TestServer::json_body(server.get(&format!("/admin/providers/{id}")).await).await;
    assert_eq!(provider["models"].as_array().unwrap().len(), 1);
    assert_eq!(provider["models"][0]["name"], "Large");
}

#[tokio::test]
async fn test_admin_endpoint_toggle_and_provider_deactivate() {
    let upstream = MockServer::start().await;
    let server = TestServer::start().await;
    let id = server.register_provider(&provider_json(&upstream.uri()), false).await;

    let deactivate = server
        .post_json(&format!("/admin/providers/{id}/endpoints/chat/deactivate"), &json!({}))
        .await;
    assert_status(&deactivate, 204);

    // Already inactive.
    let again = server
        .post_json(&format!("/admin/providers/{id}/endpoints/chat/deactivate"), &json!({}))
        .await;
    assert_status(&again, 409);

    let response = server.post_json("/v1/proxy", &proxy_body(&id, false)).await;
    assert_status(&response, 422);
    assert_eq!(
        TestServer::json_body(response).await["error"]["code"],
        "endpoint_inactive"
    );

    let off = server
        .post_json(&format!("/admin/providers/{id}/deactivate"), &json!({}))
        .await;
    assert_status(&off, 204);

    let response = server.post_json("/v1/proxy", &proxy_body(&id, false)).await;
    assert_eq!(
        TestServer::json_body(response).await["error"]["code"],
        "provider_inactive"
    );
}

#[tokio::test]
async fn test_admin_rejects_missing_templates() {
    let server = TestServer::start().await;
    let mut body = provider_json("http://127.0.0.1:9");
    body["request_template"] = json!("  ");

    let response = server.post_json("/admin/providers", &body).await;
    assert_status(&response, 400);
    let body = TestServer::json_body(response).await;
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn test_metrics_count_dispatches() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("hi")))
        .mount(&upstream)
        .await;

    let server = TestServer::start().await;
    let id = server.register_provider(&provider_json(&upstream.uri()), false).await;
    assert_status(&server.post_json("/v1/proxy", &proxy_body(&id, false)).await, 200);

    let metrics = server.get("/metrics").await.text().await.unwrap();
    let provider_label = format!("provider=\"{id}\"");
    let counted = metrics.lines().any(|line| {
        line.starts_with("gateway_dispatch_total{")
            && line.contains(&provider_label)
            && line.contains("mode=\"buffered\"")
            && line.contains("outcome=\"ok\"")
            && line.ends_with(" 1")
    });
    assert!(counted, "dispatch not counted in:\n{metrics}");
}

#[tokio::test]
async fn test_remove_provider() {
    let server = TestServer::start().await;
    let id = server
        .register_provider(&provider_json("http://127.0.0.1:9"), false)
        .await;

    assert_status(&server.delete(&format!("/admin/providers/{id}")).await, 204);
    assert_status(&server.get(&format!("/admin/providers/{id}")).await, 404);
    assert_status(&server.delete(&format!("/admin/providers/{id}")).await, 404);
}
