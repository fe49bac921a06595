//! Prometheus metrics for dispatches and streams.

use crate::tracing_setup::TelemetryError;
use gateway_core::GatewayError;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Outcome label for a finished dispatch
#[must_use]
pub fn outcome_label(result: Result<(), &GatewayError>) -> &'static str {
    match result {
        Ok(()) => "ok",
        Err(e) => e.label(),
    }
}

/// Dispatch and stream metrics on a private registry
#[derive(Clone)]
pub struct GatewayMetrics {
    registry: Registry,
    dispatch_total: IntCounterVec,
    dispatch_duration_seconds: HistogramVec,
    stream_chunks_total: IntCounterVec,
    stream_frames_dropped_total: IntCounterVec,
    stream_terminations_total: IntCounterVec,
}

impl std::fmt::Debug for GatewayMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayMetrics").finish_non_exhaustive()
    }
}

impl GatewayMetrics {
    /// Create and register all metrics
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let dispatch_total = IntCounterVec::new(
            Opts::new("gateway_dispatch_total", "Dispatches by provider, mode and outcome"),
            &["provider", "mode", "outcome"],
        )?;
        let dispatch_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "gateway_dispatch_duration_seconds",
                "Time until the upstream response or stream was available",
            )
            .buckets(vec![
                0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
            ]),
            &["provider", "mode"],
        )?;
        let stream_chunks_total = IntCounterVec::new(
            Opts::new("gateway_stream_chunks_total", "Chunks delivered to stream consumers"),
            &["provider"],
        )?;
        let stream_frames_dropped_total = IntCounterVec::new(
            Opts::new(
                "gateway_stream_frames_dropped_total",
                "Stream frames skipped after a decode or render failure",
            ),
            &["provider"],
        )?;
        let stream_terminations_total = IntCounterVec::new(
            Opts::new("gateway_stream_terminations_total", "Finished streams by exit reason"),
            &["provider", "reason"],
        )?;

        registry.register(Box::new(dispatch_total.clone()))?;
        registry.register(Box::new(dispatch_duration_seconds.clone()))?;
        registry.register(Box::new(stream_chunks_total.clone()))?;
        registry.register(Box::new(stream_frames_dropped_total.clone()))?;
        registry.register(Box::new(stream_terminations_total.clone()))?;

        Ok(Self {
            registry,
            dispatch_total,
            dispatch_duration_seconds,
            stream_chunks_total,
            stream_frames_dropped_total,
            stream_terminations_total,
        })
    }

    /// Record a dispatch outcome
    pub fn record_dispatch(&self, provider: &str, mode: &str, outcome: &str, elapsed: Duration) {
        self.dispatch_total
            .with_label_values(&[provider, mode, outcome])
            .inc();
        self.dispatch_duration_seconds
            .with_label_values(&[provider, mode])
            .observe(elapsed.as_secs_f64());
    }

    /// Record a finished stream
    pub fn record_stream(&self, provider: &str, chunks: u64, dropped: u64, reason: &str) {
        self.stream_chunks_total
            .with_label_values(&[provider])
            .inc_by(chunks);
        self.stream_frames_dropped_total
            .with_label_values(&[provider])
            .inc_by(dropped);
        self.stream_terminations_total
            .with_label_values(&[provider, reason])
            .inc();
    }

    /// The underlying registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode all metrics in the text exposition format
    pub fn gather(&self) -> Result<String, TelemetryError> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Encoding(e.to_string()))
    }
}
