//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;

use super::LosslessDownloader;

impl LosslessDownloader {
    /// Gracefully shut down the downloader
    ///
    /// This method performs the shutdown sequence:
    /// 1. Stops accepting new side effects (later downloads still run, but
    ///    their lyrics and history work is not started)
    /// 2. Waits for running lyrics/history tasks, up to the configured drain
    ///    timeout
    /// 3. Abandons whatever is still running after the timeout
    /// 4. Emits [`Event::Shutdown`]
    ///
    /// Calling it again is harmless.
    ///
    /// # Errors
    ///
    /// Currently never fails; the `Result` leaves room for shutdown steps
    /// that can.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        if self.side_effects.shutdown().await {
            tracing::info!("All side effects completed");
        } else {
            tracing::warn!("Some side effects were abandoned during shutdown");
        }

        self.emit_event(Event::Shutdown);

        // The database pool closes when the last Arc is dropped
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Number of lyrics/history tasks still running
    pub fn pending_side_effects(&self) -> usize {
        self.side_effects.pending()
    }
}
