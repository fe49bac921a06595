//! Stream relay against simulated event-stream upstreams

use crate::fixtures::*;
use crate::helpers::*;
use gateway_core::{ConfigurationErrorKind, GatewayError, GatewayResponse, MessageRole};
use gateway_providers::{ResponseStream, StreamTermination};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn event_stream(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

async fn drain(stream: &mut ResponseStream) -> Vec<GatewayResponse> {
    let mut chunks = Vec::new();
    while let Some(chunk) = timeout(Duration::from_secs(5), stream.recv())
        .await
        .expect("stream stalled")
    {
        chunks.push(chunk);
    }
    chunks
}

async fn openai_upstream(body: String) -> (MockServer, TestGateway, gateway_core::ProviderId) {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(event_stream(body))
        .mount(&upstream)
        .await;

    let harness = TestGateway::new();
    let id = harness
        .register(
            &upstream.uri(),
            OPENAI_REQUEST_TEMPLATE,
            OPENAI_RESPONSE_TEMPLATE,
            true,
        )
        .await;
    (upstream, harness, id)
}

#[tokio::test]
async fn test_three_frames_then_done_yields_three_chunks() {
    let frames = ["Par", "is", "."].map(|t| openai_chunk(t).to_string());
    let (_upstream, harness, id) = openai_upstream(sse_body(frames, true)).await;

    let mut stream = harness
        .gateway
        .dispatch_stream(&chat_request(id, "large"), CancellationToken::new())
        .await
        .unwrap();

    let chunks = drain(&mut stream).await;
    let text: Vec<_> = chunks.iter().filter_map(GatewayResponse::first_text).collect();
    assert_eq!(text, vec!["Par", "is", "."]);

    let summary = stream.finish().await;
    assert_eq!(summary.chunks_emitted, 3);
    assert_eq!(summary.frames_dropped, 0);
    assert_eq!(summary.termination, StreamTermination::Done);
}

#[tokio::test]
async fn test_streaming_forces_stream_flag_and_accept_header() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(header("accept", "text/event-stream"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(event_stream(sse_body([openai_chunk("ok").to_string()], true)))
        .expect(1)
        .mount(&upstream)
        .await;

    let harness = TestGateway::new();
    let id = harness
        .register(
            &upstream.uri(),
            OPENAI_REQUEST_TEMPLATE,
            OPENAI_RESPONSE_TEMPLATE,
            true,
        )
        .await;

    // The caller left `stream` false.
    let request = chat_request(id, "large");
    assert!(!request.stream);

    let mut stream = harness
        .gateway
        .dispatch_stream(&request, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(drain(&mut stream).await.len(), 1);
}

#[tokio::test]
async fn test_malformed_frame_is_dropped() {
    let frames = [
        openai_chunk("one").to_string(),
        "{\"choices\": [".to_string(),
        openai_chunk("two").to_string(),
    ];
    let (_upstream, harness, id) = openai_upstream(sse_body(frames, true)).await;

    let mut stream = harness
        .gateway
        .dispatch_stream(&chat_request(id, "large"), CancellationToken::new())
        .await
        .unwrap();

    let chunks = drain(&mut stream).await;
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[1].first_text().as_deref(), Some("two"));

    let summary = stream.finish().await;
    assert_eq!(summary.frames_dropped, 1);
    assert_eq!(summary.termination, StreamTermination::Done);
}

#[tokio::test]
async fn test_role_only_chunk_with_null_content_is_relayed() {
    let role_only = json!({
        "model": "gpt-upstream",
        "choices": [{ "index": 0, "delta": { "role": "assistant", "content": null }, "finish_reason": null }]
    });
    let frames = [role_only.to_string(), openai_chunk("Paris").to_string()];
    let (_upstream, harness, id) = openai_upstream(sse_body(frames, true)).await;

    let mut stream = harness
        .gateway
        .dispatch_stream(&chat_request(id, "large"), CancellationToken::new())
        .await
        .unwrap();

    let chunks = drain(&mut stream).await;
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].choices[0].delta.role, Some(MessageRole::Assistant));
    assert_eq!(chunks[0].first_text().as_deref(), Some(""));
    assert_eq!(chunks[1].first_text().as_deref(), Some("Paris"));
    assert_eq!(stream.finish().await.frames_dropped, 0);
}

#[tokio::test]
async fn test_upstream_close_without_terminator() {
    let frames = ["a", "b"].map(|t| openai_chunk(t).to_string());
    let (_upstream, harness, id) = openai_upstream(sse_body(frames, false)).await;

    let mut stream = harness
        .gateway
        .dispatch_stream(&chat_request(id, "large"), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(drain(&mut stream).await.len(), 2);
    assert_eq!(stream.finish().await.termination, StreamTermination::UpstreamClosed);
}

#[tokio::test]
async fn test_streaming_gate_blocks_before_network() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let harness = TestGateway::new();
    let id = harness.register(&upstream.uri(), IDENTITY, IDENTITY, false).await;

    let err = harness
        .gateway
        .dispatch_stream(&chat_request(id, "large"), CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(
        err.configuration_kind(),
        Some(ConfigurationErrorKind::StreamingUnsupported)
    );
}

#[tokio::test]
async fn test_error_status_aborts_before_stream_opens() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&upstream)
        .await;

    let harness = TestGateway::new();
    let id = harness.register(&upstream.uri(), IDENTITY, IDENTITY, true).await;

    let err = harness
        .gateway
        .dispatch_stream(&chat_request(id, "large"), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GatewayError::Transport {
            status: Some(500),
            ..
        }
    ));
}

#[tokio::test]
async fn test_cancellation_closes_channel_and_releases_upstream() {
    let (base_url, released) = hanging_stream_upstream(openai_chunk("first").to_string()).await;

    let harness = TestGateway::new();
    let id = harness
        .register(&base_url, OPENAI_REQUEST_TEMPLATE, OPENAI_RESPONSE_TEMPLATE, true)
        .await;

    let cancel = CancellationToken::new();
    let mut stream = harness
        .gateway
        .dispatch_stream(&chat_request(id, "large"), cancel.clone())
        .await
        .unwrap();

    let first = timeout(Duration::from_secs(5), stream.recv())
        .await
        .expect("first chunk")
        .expect("open channel");
    assert_eq!(first.first_text().as_deref(), Some("first"));

    cancel.cancel();

    let next = timeout(Duration::from_secs(2), stream.recv())
        .await
        .expect("channel closes after cancel");
    assert!(next.is_none());

    timeout(Duration::from_secs(2), released)
        .await
        .expect("upstream connection released")
        .expect("upstream task alive");

    assert_eq!(stream.finish().await.termination, StreamTermination::Cancelled);
}
