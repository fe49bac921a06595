//! Process signal handling for graceful shutdown.

use std::future::Future;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Resolve when the process receives Ctrl+C or SIGTERM.
///
/// A handler that cannot be installed is logged and never fires; the
/// other one still does.
pub async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        "ctrl+c"
    };

    #[cfg(unix)]
    let sigterm = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
        "sigterm"
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<&str>();

    let signal_name = tokio::select! {
        name = ctrl_c => name,
        name = sigterm => name,
    };

    info!(signal = signal_name, "Received shutdown signal");
    signal_name
}

/// Forward the first completion of `signal` into a cancellation token
pub fn cancel_on<F>(signal: F) -> CancellationToken
where
    F: Future + Send + 'static,
{
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        signal.await;
        trigger.cancel();
    });
    token
}

/// Wait for `token`, then for `grace` more
pub async fn drain_deadline(token: CancellationToken, grace: Duration) {
    token.cancelled().await;
    info!(grace_secs = grace.as_secs_f64(), "Draining in-flight requests");
    tokio::time::sleep(grace).await;
}
