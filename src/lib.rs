//! # lossless-dl
//!
//! Download orchestration for lossless audio back-ends.
//!
//! ## Design Philosophy
//!
//! lossless-dl is designed to be:
//! - **Idempotent** - A plausible file at the planned path is never downloaded twice
//! - **Back-end agnostic** - Tidal, Qobuz and Amazon capabilities are plugged in by the caller
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! Each request is planned to a deterministic path, checked against what is
//! already on disk, handed to one back-end (with the ISRC resolved first for
//! back-ends that need it) and, after a fresh download, enriched in the
//! background with lyrics and a history record.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lossless_dl::{
//!     Backends, BackendError, Config, DownloadPreferences, DownloadRequest, FetchByIsrc,
//!     FetchByReferenceId, FetchParams, FetchResult, Isrc, LosslessDownloader, ReferenceId,
//!     TrackIdentity,
//! };
//! use std::sync::Arc;
//!
//! struct MyTidal;
//!
//! #[async_trait::async_trait]
//! impl FetchByReferenceId for MyTidal {
//!     async fn fetch(&self, _id: &ReferenceId, params: &FetchParams) -> Result<FetchResult, BackendError> {
//!         // ...download into params.target...
//!         Ok(FetchResult::Downloaded(params.target.clone()))
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "my-tidal"
//!     }
//! }
//!
//! struct MyQobuz;
//!
//! #[async_trait::async_trait]
//! impl FetchByIsrc for MyQobuz {
//!     async fn fetch(&self, _isrc: &Isrc, params: &FetchParams) -> Result<FetchResult, BackendError> {
//!         Ok(FetchResult::Downloaded(params.target.clone()))
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "my-qobuz"
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backends = Backends {
//!         tidal: Arc::new(MyTidal),
//!         qobuz: Arc::new(MyQobuz),
//!         amazon: Arc::new(MyTidal),
//!     };
//!     let config = Config::default();
//!     let preferences = DownloadPreferences::from_config(&config);
//!     let downloader = LosslessDownloader::new(config, backends).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let identity = TrackIdentity::new(ReferenceId::parse("4cOdK2wGLETKBW3PvgPWqT")?, "Song", "Band");
//!     let outcome = downloader
//!         .execute(DownloadRequest::new(identity, preferences))
//!         .await;
//!     println!("{}: {:?}", outcome.message, outcome.file);
//!
//!     downloader.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Back-end kinds, capabilities and dispatch
pub mod backend;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Cross-catalog ISRC resolution
pub mod identity;
/// Lyrics lookup and embedding
pub mod lyrics;
/// Output path planning
pub mod planner;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use backend::{
    AutoSelectionPolicy, BackendKind, FetchByIsrc, FetchByReferenceId, FetchParams, FetchResult,
    Quality, ServiceSelection,
};
pub use config::Config;
pub use db::{Database, HistoryStore};
pub use downloader::{Backends, Collaborators, LosslessDownloader};
pub use error::{BackendError, DatabaseError, Error, ErrorKind, Result};
pub use identity::{
    Availability, CrossCatalogResolver, IdentityResolver, MetadataProvider, Platform,
    SongLinkResolver,
};
pub use lyrics::{LrclibProvider, Lyrics, LyricsProvider, MultiSourceLyrics};
pub use planner::{FilenameFormat, FolderTemplate};
pub use types::{
    DownloadOutcome, DownloadPreferences, DownloadRequest, DownloadState, Event, HistoryEntry,
    HistoryItem, Isrc, ReferenceId, TrackIdentity,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method,
/// which drains pending lyrics and history work.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use lossless_dl::{LosslessDownloader, run_with_shutdown};
///
/// async fn serve(downloader: LosslessDownloader) -> lossless_dl::Result<()> {
///     // Requests run on clones of the downloader elsewhere
///     run_with_shutdown(downloader).await
/// }
/// ```
pub async fn run_with_shutdown(downloader: LosslessDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
