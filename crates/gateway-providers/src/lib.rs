//! # Gateway Providers
//!
//! The dispatch path of the provider gateway:
//! - Template translation between canonical and provider wire formats
//! - Pre-dispatch validation
//! - HTTP transport with a shared connection pool
//! - SSE stream multiplexing onto a bounded channel
//! - The [`ProviderGateway`] orchestrator tying them together

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod gateway;
pub mod sse;
pub mod template;
pub mod transport;
pub mod validation;

// Re-export main types
pub use gateway::{join_target, ProviderGateway};
pub use sse::{
    ResponseStream, StreamMultiplexer, StreamSummary, StreamTermination, DEFAULT_CHANNEL_CAPACITY,
    MAX_LINE_BYTES,
};
pub use template::{CompiledTemplates, IDENTITY_TEMPLATE};
pub use transport::{
    build_headers, ByteStream, HttpTransport, HttpTransportConfig, UpstreamRequest,
    UpstreamResponse, UpstreamTransport,
};
pub use validation::{validate_dispatch, DispatchMode, DispatchTarget};
