//! HTTP server lifecycle.

use axum::Router;
use gateway_config::ServerConfig;
use gateway_core::GatewayError;
use gateway_telemetry::TelemetryError;
use std::future::{Future, IntoFuture};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::{
    routes::create_router,
    shutdown::{cancel_on, drain_deadline, shutdown_signal},
    state::AppState,
};

/// Errors that stop the server
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Address that was requested
        address: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The accept loop failed
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    /// Metrics or logging setup failed
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// Gateway setup failed
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// The gateway HTTP server
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Create a server over prepared state
    #[must_use]
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// The full router, for embedding or testing
    #[must_use]
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Bind the configured address and serve until Ctrl+C or SIGTERM
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            shutdown_signal().await;
        })
        .await
    }

    /// Bind the configured address and serve until `signal` completes
    pub async fn run_until<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind { address, source })?;
        self.serve(listener, signal).await
    }

    /// Serve on an already bound listener.
    ///
    /// After `signal` fires, new connections are refused and open ones
    /// get `shutdown_timeout` to finish before the server returns anyway.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener.local_addr().map_err(ServerError::Serve)?;
        info!(address = %local, "Gateway listening");

        let shutdown = cancel_on(signal);
        let graceful = shutdown.clone();
        let serve = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { graceful.cancelled().await })
            .into_future();

        tokio::select! {
            result = serve => result.map_err(ServerError::Serve)?,
            () = drain_deadline(shutdown, self.config.shutdown_timeout) => {
                warn!(
                    timeout_secs = self.config.shutdown_timeout.as_secs_f64(),
                    "Shutdown timeout elapsed with connections still open"
                );
            }
        }

        info!("Gateway stopped");
        Ok(())
    }
}
