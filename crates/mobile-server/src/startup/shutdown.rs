//! Graceful shutdown handling
//!
//! A broadcast signal fired on Ctrl+C or SIGTERM. The HTTP server stops on it
//! and open binding watches end their streams.

use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct ShutdownSignal {
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    pub fn shutdown(&self) {
        // Nobody listening is fine
        let _ = self.sender.send(());
    }

    /// Resolves once shutdown is triggered
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut receiver = self.subscribe();
        async move {
            let _ = receiver.recv().await;
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Fire `shutdown` on Ctrl+C or SIGTERM
pub fn listen_for_os_signals(shutdown: ShutdownSignal) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C, initiating graceful shutdown...");
            }
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown...");
            }
        }

        shutdown.shutdown();
    });
}

/// Run `future` until it completes or shutdown is triggered
pub async fn run_with_shutdown<F, T>(future: F, shutdown: &ShutdownSignal) -> Option<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        result = future => Some(result),
        _ = shutdown.wait() => {
            warn!("Shutdown signal received, cancelling operation");
            None
        }
    }
}

/// Wait up to `timeout` for `future`, logging when it does not finish in time
pub async fn drain<F: Future<Output = ()>>(future: F, timeout: Duration) {
    if tokio::time::timeout(timeout, future).await.is_err() {
        warn!(?timeout, "Shutdown did not complete in time");
    } else {
        info!("Shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_signal() {
        let signal = ShutdownSignal::new();
        let waiting = signal.wait();

        let signal_clone = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            signal_clone.shutdown();
        });

        let result = tokio::time::timeout(Duration::from_millis(500), waiting).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_with_shutdown() {
        let signal = ShutdownSignal::new();

        let task = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            42
        };

        let signal_clone = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            signal_clone.shutdown();
        });

        assert!(run_with_shutdown(task, &signal).await.is_none());
    }

    #[tokio::test]
    async fn test_run_without_shutdown_completes() {
        let signal = ShutdownSignal::new();
        assert_eq!(run_with_shutdown(async { 7 }, &signal).await, Some(7));
    }
}
