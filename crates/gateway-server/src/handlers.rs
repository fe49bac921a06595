//! HTTP request handlers for the dispatch API.

use axum::{
    extract::State,
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::{self, StreamExt};
use gateway_core::{GatewayRequest, GatewayResponse};
use gateway_providers::{DispatchMode, StreamSummary};
use gateway_telemetry::outcome_label;
use serde::Serialize;
use std::{convert::Infallible, time::Instant};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, instrument, warn};

use crate::{
    error::ApiError,
    extractors::{JsonBody, RequestId},
    state::AppState,
};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Version
    pub version: String,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics_endpoint(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state
        .metrics
        .gather()
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response())
}

/// Dispatch a canonical request, as JSON or as an SSE relay
#[instrument(skip_all, fields(provider_id = %request.provider_id, stream = request.stream))]
pub async fn proxy(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    JsonBody(request): JsonBody<GatewayRequest>,
) -> Result<Response, ApiError> {
    request.validate()?;

    debug!(
        request_id = %request_id,
        endpoint = %request.endpoint,
        model = %request.model_key,
        "Processing proxy request"
    );

    if request.stream {
        handle_streaming_request(state, request, request_id).await
    } else {
        handle_buffered_request(state, request, request_id).await
    }
}

async fn handle_buffered_request(
    state: AppState,
    request: GatewayRequest,
    request_id: String,
) -> Result<Response, ApiError> {
    let provider = request.provider_id.to_string();
    let start = Instant::now();

    // Cancels the upstream call if the client goes away mid-flight.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let result = state.gateway.dispatch(&request, &cancel).await;
    let elapsed = start.elapsed();
    state.metrics.record_dispatch(
        &provider,
        DispatchMode::Buffered.as_str(),
        outcome_label(result.as_ref().map(|_| ())),
        elapsed,
    );

    let response = result?;
    info!(
        request_id = %request_id,
        duration_ms = elapsed.as_millis() as u64,
        "Dispatch successful"
    );
    Ok(Json(response).into_response())
}

async fn handle_streaming_request(
    state: AppState,
    request: GatewayRequest,
    request_id: String,
) -> Result<Response, ApiError> {
    let provider = request.provider_id.to_string();
    let start = Instant::now();
    let cancel = CancellationToken::new();

    let result = state.gateway.dispatch_stream(&request, cancel.clone()).await;
    state.metrics.record_dispatch(
        &provider,
        DispatchMode::Streaming.as_str(),
        outcome_label(result.as_ref().map(|_| ())),
        start.elapsed(),
    );
    let (rx, task) = result?.into_parts();

    let metrics = state.metrics.clone();
    tokio::spawn(async move {
        match task.await {
            Ok(summary) => record_summary(&metrics, &provider, &request_id, &summary),
            Err(e) => warn!(request_id = %request_id, error = %e, "Stream task failed"),
        }
    });

    Ok(Sse::new(sse_events(rx, cancel.drop_guard()))
        .keep_alive(KeepAlive::default())
        .into_response())
}

fn record_summary(
    metrics: &gateway_telemetry::GatewayMetrics,
    provider: &str,
    request_id: &str,
    summary: &StreamSummary,
) {
    metrics.record_stream(
        provider,
        summary.chunks_emitted,
        summary.frames_dropped,
        summary.termination.label(),
    );
    info!(
        request_id = %request_id,
        chunks = summary.chunks_emitted,
        dropped = summary.frames_dropped,
        reason = summary.termination.label(),
        "Stream relay finished"
    );
}

/// Relay chunks as SSE events, then `[DONE]`.
///
/// The guard lives as long as the body; dropping the body (client
/// disconnect) cancels the stream task.
fn sse_events(
    rx: mpsc::Receiver<GatewayResponse>,
    guard: DropGuard,
) -> impl futures::Stream<Item = Result<Event, Infallible>> + Send + 'static {
    let chunks = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let chunk = rx.recv().await?;
        Some((chunk_event(&chunk), (rx, guard)))
    });
    let done = stream::once(async { Ok::<_, Infallible>(Event::default().data("[DONE]")) });
    chunks.map(Ok).chain(done)
}

fn chunk_event(chunk: &GatewayResponse) -> Event {
    match serde_json::to_string(chunk) {
        Ok(data) => Event::default().data(data),
        Err(e) => Event::default().comment(format!("failed to encode chunk: {e}")),
    }
}
