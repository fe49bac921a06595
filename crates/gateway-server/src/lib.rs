//! # Gateway Server
//!
//! HTTP surface for the provider gateway.
//!
//! This crate provides:
//! - `POST /v1/proxy` for buffered and SSE dispatch
//! - Provider administration under `/admin`
//! - Health and Prometheus metrics endpoints
//! - Graceful shutdown on Ctrl+C or SIGTERM

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod admin;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod state;

// Re-export main types
pub use error::ApiError;
pub use routes::create_router;
pub use server::{Server, ServerError};
pub use shutdown::shutdown_signal;
pub use state::{AppState, AppStateBuilder};
