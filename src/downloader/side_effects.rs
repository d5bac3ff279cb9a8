//! Detached enrichment work run after a fresh download.
//!
//! Tasks are tracked so shutdown can drain them, bounded by a semaphore, and
//! raced against a cancellation token so a slow task can be abandoned. Their
//! failures are logged and published as events; nothing here reaches the
//! caller of `execute`.

use crate::backend::BackendKind;
use crate::config::SideEffectConfig;
use crate::db::HistoryStore;
use crate::error::Error;
use crate::lyrics::{LyricsProvider, LyricsQuery, embed_lyrics};
use crate::planner::OUTPUT_EXTENSION;
use crate::types::{DownloadOutcome, DownloadPreferences, Event, HistoryItem, TrackIdentity};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, broadcast};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// What the side effects need to know about a finished download
#[derive(Clone, Debug)]
pub(crate) struct SideEffectJob {
    /// Identity the back-end was called with
    pub(crate) identity: TrackIdentity,
    /// Request preferences
    pub(crate) preferences: DownloadPreferences,
    /// Back-end that produced the file
    pub(crate) backend: BackendKind,
    /// Quality token sent to the back-end
    pub(crate) quality: String,
}

/// Runs lyrics embedding and history appends off the request path
#[derive(Clone)]
pub struct SideEffectPipeline {
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
    drain_timeout: Duration,
    lyrics: Arc<dyn LyricsProvider>,
    history: Arc<dyn HistoryStore>,
    event_tx: broadcast::Sender<Event>,
}

impl SideEffectPipeline {
    /// Create a pipeline
    pub fn new(
        config: &SideEffectConfig,
        lyrics: Arc<dyn LyricsProvider>,
        history: Arc<dyn HistoryStore>,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            tracker: TaskTracker::new(),
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            cancel: CancellationToken::new(),
            drain_timeout: config.drain_timeout,
            lyrics,
            history,
            event_tx,
        }
    }

    /// Number of tasks not yet finished
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Whether [`shutdown`](Self::shutdown) has started
    pub fn is_closed(&self) -> bool {
        self.tracker.is_closed()
    }

    /// Start the side effects for `outcome`, without waiting for them
    ///
    /// Does nothing unless the outcome is a fresh download. Lyrics are only
    /// attempted when requested and the file is FLAC.
    pub(crate) fn fire(&self, outcome: &DownloadOutcome, job: SideEffectJob) {
        if !outcome.is_fresh_download() {
            return;
        }
        let Some(path) = outcome.file.clone() else {
            return;
        };

        if self.is_closed() {
            warn!(path = %path.display(), "Shutting down, side effects not started");
            return;
        }

        if job.preferences.embed_lyrics && is_flac(&path) {
            let query = LyricsQuery {
                reference_id: job.identity.reference_id.clone(),
                title: job.identity.title.clone(),
                artist: job.identity.artist.clone(),
                album: job.identity.album.clone(),
                duration_secs: None,
            };
            let lyrics = self.lyrics.clone();
            let event_tx = self.event_tx.clone();
            let lyrics_path = path.clone();
            self.spawn("lyrics", async move {
                lyrics_task(lyrics, event_tx, query, lyrics_path).await;
            });
        }

        let item = HistoryItem::for_download(&job.identity, &path, job.backend, &job.quality);
        let history = self.history.clone();
        let event_tx = self.event_tx.clone();
        self.spawn("history", async move {
            history_task(history, event_tx, item).await;
        });
    }

    /// Spawn `task` on the tracker, gated by the semaphore and the cancel token
    fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = self.permits.clone();
        let cancel = self.cancel.clone();

        self.tracker.spawn(async move {
            let _permit = tokio::select! {
                permit = permits.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
                _ = cancel.cancelled() => {
                    debug!(task = name, "Side effect abandoned before start");
                    return;
                }
            };

            tokio::select! {
                _ = task => {}
                _ = cancel.cancelled() => {
                    warn!(task = name, "Side effect abandoned during shutdown");
                }
            }
        });
    }

    /// Stop accepting work and wait for running tasks
    ///
    /// Waits up to the configured drain timeout; anything still running after
    /// that is abandoned. Returns `true` if every task finished on its own.
    pub async fn shutdown(&self) -> bool {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending > 0 {
            info!(pending, timeout = ?self.drain_timeout, "Draining side effects");
        }

        match tokio::time::timeout(self.drain_timeout, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    pending = self.tracker.len(),
                    "Timeout draining side effects, abandoning the rest"
                );
                self.cancel.cancel();
                self.tracker.wait().await;
                false
            }
        }
    }
}

fn is_flac(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(OUTPUT_EXTENSION))
}

async fn lyrics_task(
    lyrics: Arc<dyn LyricsProvider>,
    event_tx: broadcast::Sender<Event>,
    query: LyricsQuery,
    path: PathBuf,
) {
    let event = match lyrics.fetch(&query).await {
        Ok(Some(found)) => {
            let lrc = found.to_lrc(&query.title, &query.artist);
            match embed_lyrics(&path, &lrc).await {
                Ok(()) => {
                    info!(path = %path.display(), source = %found.source, "Lyrics embedded");
                    Event::LyricsEmbedded {
                        path,
                        source: found.source,
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to embed lyrics");
                    Event::LyricsFailed {
                        path,
                        error: e.to_string(),
                    }
                }
            }
        }
        Ok(None) => {
            let reason = Error::LyricsNotFound {
                title: query.title,
                artist: query.artist,
            }
            .to_string();
            debug!(path = %path.display(), reason = %reason, "Lyrics skipped");
            Event::LyricsSkipped { path, reason }
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Lyrics lookup failed");
            Event::LyricsFailed {
                path,
                error: e.to_string(),
            }
        }
    };

    event_tx.send(event).ok();
}

async fn history_task(
    history: Arc<dyn HistoryStore>,
    event_tx: broadcast::Sender<Event>,
    item: HistoryItem,
) {
    let event = match history.append(&item).await {
        Ok(id) => {
            debug!(id, path = %item.path.display(), "History recorded");
            Event::HistoryRecorded {
                id,
                path: item.path,
            }
        }
        Err(e) => {
            warn!(path = %item.path.display(), error = %e, "Failed to record history");
            Event::HistoryFailed {
                path: item.path,
                error: e.to_string(),
            }
        }
    };

    event_tx.send(event).ok();
}
