//! song.link → Deezer ISRC lookup

use super::CrossCatalogResolver;
use super::availability::{Availability, Platform};
use crate::config::IdentityConfig;
use crate::error::{Error, Result};
use crate::types::{Isrc, ReferenceId};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SongLinkResponse {
    #[serde(default)]
    links_by_platform: HashMap<String, PlatformLink>,
}

#[derive(Debug, Deserialize)]
struct PlatformLink {
    url: String,
}

#[derive(Debug, Deserialize)]
struct DeezerTrack {
    #[serde(default)]
    isrc: Option<String>,
    #[serde(default)]
    error: Option<DeezerError>,
}

#[derive(Debug, Deserialize)]
struct DeezerError {
    #[serde(default)]
    message: String,
}

/// [`CrossCatalogResolver`] using the song.link API and Deezer's public API
///
/// Both base URLs come from [`IdentityConfig`], which lets tests point the
/// resolver at a local mock server.
pub struct SongLinkResolver {
    http_client: reqwest::Client,
    songlink_url: String,
    deezer_url: String,
    user_country: String,
}

impl SongLinkResolver {
    /// Create a resolver
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &IdentityConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("lossless-dl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            songlink_url: config.songlink_url.trim_end_matches('/').to_string(),
            deezer_url: config.deezer_url.trim_end_matches('/').to_string(),
            user_country: config.user_country.clone(),
        })
    }
}

/// Deezer track ID from a track URL such as `https://www.deezer.com/track/3135556?utm=x`
fn deezer_track_id(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("/track/")?;
    let id = rest.split(['?', '/', '#']).next()?;
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_digit())).then_some(id)
}

impl SongLinkResolver {
    /// Platform key → track URL, as song.link reports them
    async fn links(&self, reference_id: &ReferenceId) -> Result<HashMap<String, String>> {
        let endpoint = format!("{}/v1-alpha.1/links", self.songlink_url);
        debug!(reference_id = %reference_id, "querying song.link");

        let body: SongLinkResponse = self
            .http_client
            .get(&endpoint)
            .query(&[
                ("url", reference_id.canonical_url()),
                ("userCountry", self.user_country.clone()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body
            .links_by_platform
            .into_iter()
            .map(|(platform, link)| (platform, link.url))
            .collect())
    }

    /// Check which platforms carry a track
    ///
    /// Without a caller-supplied `isrc`, the ISRC is looked up through the
    /// Deezer link when there is one; a failed lookup leaves it unset.
    ///
    /// # Errors
    ///
    /// Returns an error only when song.link itself cannot be queried.
    pub async fn availability(
        &self,
        reference_id: &ReferenceId,
        isrc: Option<Isrc>,
    ) -> Result<Availability> {
        let links = self.links(reference_id).await?;

        let isrc = match (isrc, links.get(Platform::Deezer.link_key())) {
            (Some(isrc), _) => Some(isrc),
            (None, Some(url)) => {
                let found = self
                    .isrc_for_url(url)
                    .await
                    .and_then(|raw| Isrc::parse(&raw));
                match found {
                    Ok(isrc) => Some(isrc),
                    Err(e) => {
                        debug!(reference_id = %reference_id, error = %e, "no ISRC for availability check");
                        None
                    }
                }
            }
            (None, None) => None,
        };

        let availability = Availability::from_links(reference_id.clone(), isrc, &links);
        debug!(
            reference_id = %reference_id,
            platforms = availability.links.len(),
            "availability checked"
        );
        Ok(availability)
    }
}

#[async_trait]
impl CrossCatalogResolver for SongLinkResolver {
    async fn secondary_url(&self, reference_id: &ReferenceId) -> Result<String> {
        self.links(reference_id)
            .await?
            .remove(Platform::Deezer.link_key())
            .ok_or_else(|| Error::Metadata(format!("song.link has no Deezer link for {reference_id}")))
    }

    async fn isrc_for_url(&self, url: &str) -> Result<String> {
        let track_id = deezer_track_id(url)
            .ok_or_else(|| Error::Metadata(format!("not a Deezer track URL: {url}")))?;

        let endpoint = format!("{}/track/{track_id}", self.deezer_url);
        debug!(track_id, "querying Deezer");

        let track: DeezerTrack = self
            .http_client
            .get(&endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = track.error {
            return Err(Error::Metadata(format!("Deezer error: {}", error.message)));
        }

        track
            .isrc
            .filter(|isrc| !isrc.is_empty())
            .ok_or_else(|| Error::Metadata(format!("Deezer track {track_id} has no ISRC")))
    }
}
