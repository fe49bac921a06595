//! Integration tests for the provider gateway
//!
//! Upstream providers are simulated with wiremock (or a raw socket where
//! connection lifetime matters). Covers:
//! - Dispatch through the real HTTP transport
//! - Stream relay, frame tolerance and cancellation
//! - The HTTP ingress and administration API end to end

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items
pub use fixtures::*;
pub use helpers::*;

#[cfg(test)]
mod api_tests;
#[cfg(test)]
mod dispatch_tests;
#[cfg(test)]
mod streaming_tests;
