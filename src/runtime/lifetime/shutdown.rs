use tokio::signal;
use tracing::{info, warn};

/// 等待 Ctrl+C
///
/// Deletion batches still running are dropped with the runtime.
pub async fn listen_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, stopping server...");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }
}
