//! # Gateway Telemetry
//!
//! Observability for the provider gateway.
//!
//! This crate provides:
//! - Structured logging bootstrap (pretty or JSON)
//! - Prometheus dispatch and stream metrics
//! - Span macros shared by the dispatch path

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;
pub mod tracing_setup;

// Re-export main types
pub use logging::{build_filter, init_logging, LoggingConfig};
pub use metrics::{outcome_label, GatewayMetrics};
pub use tracing_setup::TelemetryError;
