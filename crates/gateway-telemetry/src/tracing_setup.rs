//! Span macros and telemetry errors.

/// Telemetry initialization error
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to install the subscriber
    #[error("Failed to initialize logging: {0}")]
    Init(String),
    /// Invalid filter directive
    #[error("Invalid log filter '{directive}': {message}")]
    Filter {
        /// Directive as given
        directive: String,
        /// Parser message
        message: String,
    },
    /// Metric registration or encoding failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
    /// Encoded metrics were not UTF-8
    #[error("Metrics encoding error: {0}")]
    Encoding(String),
}

/// Create a span for one dispatch
#[macro_export]
macro_rules! dispatch_span {
    ($provider:expr, $endpoint:expr, $model:expr, $mode:expr) => {
        tracing::info_span!(
            "dispatch",
            provider = %$provider,
            endpoint = %$endpoint,
            model = %$model,
            mode = %$mode
        )
    };
}

/// Create a span for an upstream HTTP call
#[macro_export]
macro_rules! upstream_span {
    ($url:expr, $operation:expr) => {
        tracing::info_span!(
            "upstream_call",
            url = %$url,
            operation = %$operation
        )
    };
}
