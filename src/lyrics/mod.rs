//! Lyrics lookup and embedding
//!
//! Providers answer a [`LyricsQuery`] with [`Lyrics`]; [`MultiSourceLyrics`]
//! tries several providers in order. The result is rendered as LRC and
//! written into the audio file's tag by [`embed_lyrics`].

mod embed;
mod lrc;
mod lrclib;

pub use embed::{embed_lyrics, read_embedded_lyrics};
pub use lrclib::LrclibProvider;

use crate::error::Result;
use crate::types::ReferenceId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Whether lines carry timestamps
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    /// Every line has a start time
    LineSynced,
    /// Plain text
    Unsynced,
}

/// One line of lyrics
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricLine {
    /// Start time in milliseconds (synced lyrics only)
    pub start_ms: Option<u64>,
    /// Line text (may be empty for instrumental breaks)
    pub text: String,
}

/// Lyrics for a track
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lyrics {
    /// Provider that returned them
    pub source: String,
    /// Timing information available
    pub sync_type: SyncType,
    /// The lines, in order
    pub lines: Vec<LyricLine>,
}

impl Lyrics {
    /// Whether there is any text to embed
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.text.trim().is_empty())
    }
}

/// What to look lyrics up by
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LyricsQuery {
    /// Reference-catalog track ID
    pub reference_id: ReferenceId,
    /// Track title
    pub title: String,
    /// Artist
    pub artist: String,
    /// Album name (empty when unknown)
    pub album: String,
    /// Track length in seconds, if known
    pub duration_secs: Option<u32>,
}

/// A lyrics source
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// Look up lyrics
    ///
    /// Returns `Ok(None)` when the source has nothing for the track.
    ///
    /// # Errors
    ///
    /// Returns an error when the source could not be queried.
    async fn fetch(&self, query: &LyricsQuery) -> Result<Option<Lyrics>>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Tries providers in order and returns the first non-empty answer
///
/// A provider error does not stop the chain. If every provider errored, the
/// last error is returned; if at least one answered and none had lyrics, the
/// result is `Ok(None)`.
#[derive(Clone, Default)]
pub struct MultiSourceLyrics {
    providers: Vec<Arc<dyn LyricsProvider>>,
}

impl MultiSourceLyrics {
    /// Chain over `providers`, queried in the given order
    pub fn new(providers: Vec<Arc<dyn LyricsProvider>>) -> Self {
        Self { providers }
    }

    /// Whether any provider is configured
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl LyricsProvider for MultiSourceLyrics {
    async fn fetch(&self, query: &LyricsQuery) -> Result<Option<Lyrics>> {
        let mut last_error = None;
        let mut answered = false;

        for provider in &self.providers {
            match provider.fetch(query).await {
                Ok(Some(lyrics)) if !lyrics.is_empty() => {
                    debug!(source = provider.name(), lines = lyrics.lines.len(), "lyrics found");
                    return Ok(Some(lyrics));
                }
                Ok(_) => {
                    debug!(source = provider.name(), "no lyrics from source");
                    answered = true;
                }
                Err(e) => {
                    debug!(source = provider.name(), error = %e, "lyrics source failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !answered => Err(e),
            _ => Ok(None),
        }
    }

    fn name(&self) -> &'static str {
        "multi-source"
    }
}
