//! HTTP transport to upstream providers.
//!
//! One pooled `reqwest::Client` serves both delivery modes. Buffered calls
//! carry a per-request timeout; streaming calls are unbounded unless a
//! stream timeout is configured.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures_util::StreamExt;
use gateway_core::{GatewayError, GatewayResult};
use gateway_telemetry::upstream_span;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn, Instrument};

/// Raw upstream byte chunks
pub type ByteStream = BoxStream<'static, GatewayResult<Bytes>>;

/// A fully prepared upstream call
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    /// Absolute target URL
    pub target: String,
    /// HTTP method
    pub method: Method,
    /// Headers, including auth
    pub headers: HeaderMap,
    /// Rendered body
    pub body: Bytes,
}

/// A buffered upstream reply
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    /// HTTP status
    pub status: u16,
    /// Full body
    pub body: Bytes,
    /// Time until the body was read
    pub latency: Duration,
}

/// Sends prepared requests upstream
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    /// Send and read the whole body. Status >= 400 is a transport error
    /// carrying the status and body.
    async fn send(
        &self,
        request: UpstreamRequest,
        cancel: &CancellationToken,
    ) -> GatewayResult<UpstreamResponse>;

    /// Send and return the body as a byte stream once headers arrive
    async fn open_stream(
        &self,
        request: UpstreamRequest,
        cancel: &CancellationToken,
    ) -> GatewayResult<ByteStream>;
}

/// Client tuning
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Timeout for buffered calls
    pub request_timeout: Duration,
    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,
    /// Optional cap on a whole streaming call
    pub stream_timeout: Option<Duration>,
    /// How long to drain an error body before giving up on a stream
    pub error_drain_timeout: Duration,
    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,
    /// How long idle connections are kept
    pub pool_idle_timeout: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            stream_timeout: None,
            error_drain_timeout: Duration::from_secs(5),
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl HttpTransportConfig {
    /// Set the buffered request timeout
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the streaming timeout
    #[must_use]
    pub fn with_stream_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stream_timeout = timeout;
        self
    }

    /// Set the error body drain timeout for streaming calls
    #[must_use]
    pub fn with_error_drain_timeout(mut self, timeout: Duration) -> Self {
        self.error_drain_timeout = timeout;
        self
    }

    /// Set pool sizing
    #[must_use]
    pub fn with_pool(mut self, max_idle_per_host: usize, idle_timeout: Duration) -> Self {
        self.pool_max_idle_per_host = max_idle_per_host;
        self.pool_idle_timeout = idle_timeout;
        self
    }
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    /// Build the shared client
    pub fn new(config: HttpTransportConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .no_gzip()
            .build()
            .map_err(|e| GatewayError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Active configuration
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    fn builder(&self, request: UpstreamRequest, timeout: Option<Duration>) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(request.method, &request.target)
            .headers(request.headers)
            .body(request.body);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }
}

fn request_error(e: &reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::transport(format!("Upstream request timed out: {e}"))
    } else if e.is_connect() {
        GatewayError::transport(format!("Failed to connect upstream: {e}"))
    } else {
        GatewayError::transport(format!("Upstream request failed: {e}"))
    }
}

#[async_trait]
impl UpstreamTransport for HttpTransport {
    async fn send(
        &self,
        request: UpstreamRequest,
        cancel: &CancellationToken,
    ) -> GatewayResult<UpstreamResponse> {
        let started = Instant::now();
        let target = request.target.clone();
        let builder = self.builder(request, Some(self.config.request_timeout));

        let exchange = async {
            let response = builder.send().await.map_err(|e| {
                error!(url = %target, error = %e, "Upstream request failed");
                request_error(&e)
            })?;
            let status = response.status();
            let body = response.bytes().await.map_err(|e| {
                GatewayError::transport(format!("Failed to read upstream response: {e}"))
            })?;
            Ok::<_, GatewayError>((status, body))
        };

        let (status, body) = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(url = %target, "Upstream request cancelled");
                return Err(GatewayError::Cancelled);
            }
            result = exchange.instrument(upstream_span!(target, "send")) => result?,
        };

        let latency = started.elapsed();
        trace!(url = %target, status = %status, bytes = body.len(), "Received upstream response");

        if status.as_u16() >= 400 {
            warn!(url = %target, status = status.as_u16(), "Upstream returned error status");
            let text = String::from_utf8_lossy(&body).into_owned();
            return Err(GatewayError::upstream_status(
                status.as_u16(),
                (!text.is_empty()).then_some(text),
            ));
        }

        Ok(UpstreamResponse {
            status: status.as_u16(),
            body,
            latency,
        })
    }

    async fn open_stream(
        &self,
        request: UpstreamRequest,
        cancel: &CancellationToken,
    ) -> GatewayResult<ByteStream> {
        let target = request.target.clone();
        let builder = self.builder(request, self.config.stream_timeout);

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(url = %target, "Streaming request cancelled before headers");
                return Err(GatewayError::Cancelled);
            }
            result = builder.send().instrument(upstream_span!(target, "open_stream")) => result.map_err(|e| {
                error!(url = %target, error = %e, "Upstream streaming request failed");
                request_error(&e)
            })?,
        };

        let status = response.status();
        if status.as_u16() >= 400 {
            warn!(url = %target, status = status.as_u16(), "Upstream stream returned error status");
            // Body is not surfaced to the caller on the streaming path.
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(url = %target, "Streaming request cancelled while draining error body");
                    return Err(GatewayError::Cancelled);
                }
                drained = tokio::time::timeout(self.config.error_drain_timeout, response.bytes()) => {
                    match drained {
                        Ok(Ok(body)) => trace!(url = %target, bytes = body.len(), "Drained error body"),
                        Ok(Err(e)) => debug!(url = %target, error = %e, "Failed to drain error body"),
                        Err(_) => debug!(url = %target, "Timed out draining error body"),
                    }
                }
            }
            return Err(GatewayError::upstream_status(status.as_u16(), None));
        }

        debug!(url = %target, status = %status, "Upstream stream opened");
        let stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| GatewayError::transport(format!("Stream error: {e}")))
        });
        Ok(Box::pin(stream))
    }
}

/// Build a header map from ordered pairs; later entries overwrite earlier ones
pub fn build_headers<'a>(
    pairs: impl IntoIterator<Item = (&'a str, &'a str, bool)>,
) -> GatewayResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value, sensitive) in pairs {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| GatewayError::internal(format!("invalid header name '{name}': {e}")))?;
        let mut header_value = HeaderValue::from_str(value)
            .map_err(|e| GatewayError::internal(format!("invalid header value for '{name}': {e}")))?;
        header_value.set_sensitive(sensitive);
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}
