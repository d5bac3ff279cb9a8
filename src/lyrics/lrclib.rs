//! LRCLIB lyrics provider

use super::{Lyrics, LyricsProvider, LyricsQuery};
use crate::config::LyricsConfig;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LrclibRecord {
    #[serde(default)]
    instrumental: bool,
    #[serde(default)]
    plain_lyrics: Option<String>,
    #[serde(default)]
    synced_lyrics: Option<String>,
}

impl LrclibRecord {
    /// Synced text when present, plain text otherwise
    fn into_lyrics(self) -> Option<Lyrics> {
        if self.instrumental {
            return None;
        }
        let text = self
            .synced_lyrics
            .filter(|t| !t.trim().is_empty())
            .or(self.plain_lyrics.filter(|t| !t.trim().is_empty()))?;
        let lyrics = Lyrics::parse("LRCLIB", &text);
        (!lyrics.is_empty()).then_some(lyrics)
    }
}

/// Lyrics from [LRCLIB](https://lrclib.net)
///
/// Tries the exact-match endpoint first, then falls back to search.
pub struct LrclibProvider {
    http_client: reqwest::Client,
    base_url: String,
}

impl LrclibProvider {
    /// Create a provider
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &LyricsConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("lossless-dl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.lrclib_url.trim_end_matches('/').to_string(),
        })
    }

    async fn exact(&self, query: &LyricsQuery) -> Result<Option<LrclibRecord>> {
        let mut params = vec![
            ("track_name", query.title.clone()),
            ("artist_name", query.artist.clone()),
        ];
        if !query.album.is_empty() {
            params.push(("album_name", query.album.clone()));
        }
        if let Some(duration) = query.duration_secs {
            params.push(("duration", duration.to_string()));
        }

        let response = self
            .http_client
            .get(format!("{}/api/get", self.base_url))
            .query(&params)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        Ok(Some(response.error_for_status()?.json().await?))
    }

    async fn search(&self, query: &LyricsQuery) -> Result<Vec<LrclibRecord>> {
        let records = self
            .http_client
            .get(format!("{}/api/search", self.base_url))
            .query(&[
                ("track_name", query.title.as_str()),
                ("artist_name", query.artist.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(records)
    }
}

#[async_trait]
impl LyricsProvider for LrclibProvider {
    async fn fetch(&self, query: &LyricsQuery) -> Result<Option<Lyrics>> {
        if let Some(lyrics) = self.exact(query).await?.and_then(LrclibRecord::into_lyrics) {
            return Ok(Some(lyrics));
        }

        debug!(title = %query.title, artist = %query.artist, "no exact LRCLIB match, searching");
        Ok(self
            .search(query)
            .await?
            .into_iter()
            .find_map(LrclibRecord::into_lyrics))
    }

    fn name(&self) -> &'static str {
        "LRCLIB"
    }
}
