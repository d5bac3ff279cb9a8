//! Core downloader implementation split into focused submodules.
//!
//! The `LosslessDownloader` struct and its methods are organized by domain:
//! - [`execute`] - The per-request state machine (plan, skip, dispatch, cleanup)
//! - [`side_effects`] - Detached lyrics and history tasks
//! - [`lifecycle`] - Shutdown and side-effect draining

mod execute;
mod lifecycle;
mod side_effects;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use side_effects::SideEffectPipeline;

use crate::backend::{AutoSelectionPolicy, BackendRegistry, FetchByIsrc, FetchByReferenceId};
use crate::config::Config;
use crate::db::{Database, HistoryStore};
use crate::error::Result;
use crate::identity::{CrossCatalogResolver, IdentityResolver, SongLinkResolver};
use crate::lyrics::{LrclibProvider, LyricsProvider, MultiSourceLyrics};
use crate::types::Event;
use std::sync::Arc;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// The back-end capabilities a downloader dispatches to
///
/// Audio back-ends live outside this crate; callers provide one
/// implementation per back-end.
#[derive(Clone)]
pub struct Backends {
    /// Tidal capability
    pub tidal: Arc<dyn FetchByReferenceId>,
    /// Qobuz capability
    pub qobuz: Arc<dyn FetchByIsrc>,
    /// Amazon Music capability
    pub amazon: Arc<dyn FetchByReferenceId>,
}

/// Every collaborator a downloader talks to
///
/// [`LosslessDownloader::new`] builds the stock ones from [`Config`];
/// [`LosslessDownloader::with_collaborators`] takes them as given.
#[derive(Clone)]
pub struct Collaborators {
    /// Download back-ends
    pub backends: Backends,
    /// Reference ID → ISRC lookup
    pub catalog: Arc<dyn CrossCatalogResolver>,
    /// Lyrics source (usually a [`MultiSourceLyrics`])
    pub lyrics: Arc<dyn LyricsProvider>,
    /// History sink
    pub history: Arc<dyn HistoryStore>,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct LosslessDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Back-end capabilities and the ISRC resolver in front of them
    pub(crate) registry: BackendRegistry,
    /// Decides which back-end serves `auto`
    pub(crate) policy: AutoSelectionPolicy,
    /// Detached lyrics/history tasks
    pub(crate) side_effects: SideEffectPipeline,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// History database, when the downloader opened it itself
    pub(crate) db: Option<Arc<Database>>,
}

impl LosslessDownloader {
    /// Create a new LosslessDownloader instance
    ///
    /// This initializes the stock collaborators:
    /// - Validates the configuration
    /// - Opens/creates the SQLite history database
    /// - Builds the song.link/Deezer ISRC resolver
    /// - Builds the lyrics chain (LRCLIB, unless disabled)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the database cannot
    /// be opened, or an HTTP client cannot be created.
    pub async fn new(config: Config, backends: Backends) -> Result<Self> {
        config.validate()?;

        let db = Arc::new(Database::new(&config.persistence.database_path).await?);
        let catalog = Arc::new(SongLinkResolver::new(&config.identity)?);

        let mut sources: Vec<Arc<dyn LyricsProvider>> = Vec::new();
        if config.lyrics.lrclib_enabled {
            sources.push(Arc::new(LrclibProvider::new(&config.lyrics)?));
        }

        let collaborators = Collaborators {
            backends,
            catalog,
            lyrics: Arc::new(MultiSourceLyrics::new(sources)),
            history: db.clone(),
        };

        let mut downloader = Self::with_collaborators(config, collaborators);
        downloader.db = Some(db);
        Ok(downloader)
    }

    /// Create a downloader from explicit collaborators
    ///
    /// The configuration is used as given; call [`Config::validate`] first
    /// if it came from user input.
    pub fn with_collaborators(config: Config, collaborators: Collaborators) -> Self {
        let Collaborators {
            backends,
            catalog,
            lyrics,
            history,
        } = collaborators;

        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let registry = BackendRegistry::new(
            backends.tidal,
            backends.qobuz,
            backends.amazon,
            IdentityResolver::new(catalog),
        );

        let side_effects = SideEffectPipeline::new(
            &config.side_effects,
            lyrics,
            history,
            event_tx.clone(),
        );

        tracing::info!(
            auto_backend = %config.backends.auto_backend,
            output_dir = %config.download.output_dir.display(),
            "Downloader initialized"
        );

        Self {
            policy: AutoSelectionPolicy::new(config.backends.auto_backend),
            config: Arc::new(config),
            registry,
            side_effects,
            event_tx,
            db: None,
        }
    }

    /// Subscribe to download events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than 1000 events,
    /// it will receive a `RecvError::Lagged` error.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// History database opened by [`new`](Self::new)
    ///
    /// None when the downloader was built with
    /// [`with_collaborators`](Self::with_collaborators).
    pub fn database(&self) -> Option<&Arc<Database>> {
        self.db.as_ref()
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }
}
