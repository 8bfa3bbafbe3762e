//! Graceful Shutdown Handler
//!
//! Waits for a termination signal and winds the location service down.

use crate::application::LocationService;
use crate::domain::value_objects::ConnectionState;
use std::time::Duration;

/// Signal that ended the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    CtrlC,
    Terminate,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CtrlC => write!(f, "Ctrl+C"),
            Self::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Install signal handlers and wait for the first shutdown signal.
#[cfg_attr(coverage_nightly, coverage(off))]
pub async fn shutdown_signal() -> anyhow::Result<ShutdownSignal> {
    #[cfg(unix)]
    let mut sigterm =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    #[cfg(unix)]
    let terminate = sigterm.recv();

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Option<()>>();

    let signal = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            ShutdownSignal::CtrlC
        }
        _ = terminate => ShutdownSignal::Terminate,
    };

    tracing::info!("received {}, initiating shutdown", signal);
    Ok(signal)
}

/// Stop `service` and wait (up to `timeout`) for it to disconnect.
///
/// Returns false if the service did not reach `Disconnected` in time.
pub async fn graceful_stop(service: &LocationService, timeout: Duration) -> bool {
    if service.stop().is_err() {
        return true;
    }

    let stopped = async {
        service.settle().await.is_ok()
            && service
                .wait_for_state(ConnectionState::Disconnected)
                .await
                .is_ok()
    };

    match tokio::time::timeout(timeout, stopped).await {
        Ok(done) => done,
        Err(_) => {
            tracing::warn!(
                "shutdown timeout: location service still {}",
                service.connection_state()
            );
            false
        }
    }
}
