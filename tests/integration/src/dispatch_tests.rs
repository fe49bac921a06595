//! Buffered dispatch through the real HTTP transport

use crate::fixtures::*;
use crate::helpers::*;
use gateway_core::{ConfigurationErrorKind, GatewayError};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_identity_templates_round_trip() {
    let upstream = MockServer::start().await;
    let expected = canonical_response("Paris.");
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(&expected))
        .expect(1)
        .mount(&upstream)
        .await;

    let harness = TestGateway::new();
    let id = harness.register(&upstream.uri(), IDENTITY, IDENTITY, false).await;

    let response = harness
        .gateway
        .dispatch(&chat_request(id, "large"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response, expected);
}

#[tokio::test]
async fn test_identity_request_reaches_upstream_unchanged() {
    let upstream = MockServer::start().await;
    let harness = TestGateway::new();
    let id = harness.register(&upstream.uri(), IDENTITY, IDENTITY, false).await;
    let request = chat_request(id, "large");

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_partial_json(serde_json::to_value(&request).unwrap()))
        .respond_with(ResponseTemplate::new(200).set_body_json(canonical_response("ok")))
        .expect(1)
        .mount(&upstream)
        .await;

    harness
        .gateway
        .dispatch(&request, &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_templates_translate_both_directions() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(header("authorization", format!("Bearer {TEST_API_KEY}").as_str()))
        .and(header("content-type", "application/json"))
        .and(header("x-tenant", "integration"))
        .and(body_partial_json(json!({ "model": "large", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("Paris.")))
        .expect(1)
        .mount(&upstream)
        .await;

    let harness = TestGateway::new();
    let id = harness
        .register(
            &upstream.uri(),
            OPENAI_REQUEST_TEMPLATE,
            OPENAI_RESPONSE_TEMPLATE,
            false,
        )
        .await;

    let response = harness
        .gateway
        .dispatch(&chat_request(id, "large"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.model, "gpt-upstream");
    assert_eq!(response.provider, "openai-compatible");
    assert_eq!(response.first_text().as_deref(), Some("Paris."));
}

#[tokio::test]
async fn test_upstream_error_status_is_transport_error() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&upstream)
        .await;

    let harness = TestGateway::new();
    let id = harness.register(&upstream.uri(), IDENTITY, IDENTITY, false).await;

    let err = harness
        .gateway
        .dispatch(&chat_request(id, "large"), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        GatewayError::Transport { status, body, .. } => {
            assert_eq!(status, Some(503));
            assert_eq!(body.as_deref(), Some("overloaded"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_upstream_is_decode_error() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway timeout</html>"))
        .mount(&upstream)
        .await;

    let harness = TestGateway::new();
    let id = harness.register(&upstream.uri(), IDENTITY, IDENTITY, false).await;

    let err = harness
        .gateway
        .dispatch(&chat_request(id, "large"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_decode(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_inactive_provider_reported_before_missing_model() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let harness = TestGateway::new();
    let id = harness.register(&upstream.uri(), IDENTITY, IDENTITY, false).await;
    harness.admin.deactivate_provider(id).await.unwrap();

    let err = harness
        .gateway
        .dispatch(&chat_request(id, "no-such-model"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(
        err.configuration_kind(),
        Some(ConfigurationErrorKind::ProviderInactive)
    );
}

#[tokio::test]
async fn test_duplicate_model_key_leaves_models_unchanged() {
    let harness = TestGateway::new();
    let id = harness
        .register("http://127.0.0.1:9", IDENTITY, IDENTITY, false)
        .await;

    let err = harness
        .admin
        .add_models(id, vec![new_model("small", false), new_model("large", true)])
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Conflict { .. }), "unexpected error: {err:?}");

    let provider = harness.admin.get_provider(id).await.unwrap();
    assert_eq!(provider.models().len(), 1);
    assert!(provider.model("small").is_none());
    assert!(!provider.model("large").unwrap().capabilities().streaming);
}

#[tokio::test]
async fn test_duplicate_endpoint_name_or_path_rejected() {
    let harness = TestGateway::new();
    let id = harness
        .register("http://127.0.0.1:9", IDENTITY, IDENTITY, false)
        .await;

    let same_name = gateway_core::NewEndpoint {
        name: CHAT_ENDPOINT.to_string(),
        path: "/v2/chat".to_string(),
    };
    let same_path = gateway_core::NewEndpoint {
        name: "chat-v2".to_string(),
        path: CHAT_PATH.to_string(),
    };

    for endpoint in [same_name, same_path] {
        let err = harness
            .admin
            .add_endpoints(id, vec![endpoint])
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Conflict { .. }), "unexpected error: {err:?}");
    }

    let provider = harness.admin.get_provider(id).await.unwrap();
    assert_eq!(provider.endpoints().len(), 1);
}
