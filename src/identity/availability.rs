//! Which streaming platforms carry a track

use crate::backend::BackendKind;
use crate::types::{Isrc, ReferenceId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Streaming platforms reported by an availability check
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Spotify (the reference catalog)
    Spotify,
    /// Tidal
    Tidal,
    /// Qobuz
    Qobuz,
    /// Amazon Music
    AmazonMusic,
    /// Apple Music
    AppleMusic,
    /// Deezer
    Deezer,
    /// YouTube Music
    YoutubeMusic,
}

impl Platform {
    /// Every platform, in report order
    pub const ALL: [Platform; 7] = [
        Platform::Spotify,
        Platform::Tidal,
        Platform::Qobuz,
        Platform::AmazonMusic,
        Platform::AppleMusic,
        Platform::Deezer,
        Platform::YoutubeMusic,
    ];

    /// Key of this platform in song.link's `linksByPlatform`
    pub fn link_key(&self) -> &'static str {
        match self {
            Platform::Spotify => "spotify",
            Platform::Tidal => "tidal",
            Platform::Qobuz => "qobuz",
            Platform::AmazonMusic => "amazonMusic",
            Platform::AppleMusic => "appleMusic",
            Platform::Deezer => "deezer",
            Platform::YoutubeMusic => "youtubeMusic",
        }
    }

    /// Name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Spotify => "Spotify",
            Platform::Tidal => "Tidal",
            Platform::Qobuz => "Qobuz",
            Platform::AmazonMusic => "Amazon Music",
            Platform::AppleMusic => "Apple Music",
            Platform::Deezer => "Deezer",
            Platform::YoutubeMusic => "YouTube Music",
        }
    }
}

impl From<BackendKind> for Platform {
    fn from(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Tidal => Platform::Tidal,
            BackendKind::Qobuz => Platform::Qobuz,
            BackendKind::Amazon => Platform::AmazonMusic,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Result of an availability check
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    /// Track that was checked
    pub reference_id: ReferenceId,
    /// ISRC, when supplied or found through Deezer
    pub isrc: Option<Isrc>,
    /// Platform URL per known platform
    pub links: HashMap<Platform, String>,
}

impl Availability {
    /// Build from raw `linksByPlatform` entries; unknown platforms are dropped
    pub(crate) fn from_links(
        reference_id: ReferenceId,
        isrc: Option<Isrc>,
        raw: &HashMap<String, String>,
    ) -> Self {
        let links = Platform::ALL
            .into_iter()
            .filter_map(|p| raw.get(p.link_key()).map(|url| (p, url.clone())))
            .collect();

        Self {
            reference_id,
            isrc,
            links,
        }
    }

    /// Whether `platform` lists the track
    pub fn is_available(&self, platform: Platform) -> bool {
        self.links.contains_key(&platform)
    }

    /// The track's URL on `platform`
    pub fn url(&self, platform: Platform) -> Option<&str> {
        self.links.get(&platform).map(String::as_str)
    }

    /// Whether the back-end can be asked for the track
    ///
    /// Qobuz is addressed by ISRC and song.link seldom lists it, so a known
    /// ISRC counts for it too.
    pub fn has_backend(&self, kind: BackendKind) -> bool {
        self.is_available(kind.into()) || (kind.requires_isrc() && self.isrc.is_some())
    }

    /// Back-ends that can be asked for the track, in [`BackendKind::ALL`] order
    pub fn backends(&self) -> Vec<BackendKind> {
        BackendKind::ALL
            .into_iter()
            .filter(|kind| self.has_backend(*kind))
            .collect()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn id() -> ReferenceId {
        "4cOdK2wGLETKBW3PvgPWqT".parse().unwrap()
    }

    #[test]
    fn links_map_onto_platforms() {
        let availability = Availability::from_links(
            id(),
            None,
            &raw(&[
                ("tidal", "https://listen.tidal.com/track/1"),
                ("amazonMusic", "https://music.amazon.com/albums/x?trackAsin=y"),
                ("soundcloud", "https://soundcloud.com/x"),
            ]),
        );

        assert_eq!(availability.links.len(), 2);
        assert!(availability.is_available(Platform::Tidal));
        assert!(availability.is_available(Platform::AmazonMusic));
        assert!(!availability.is_available(Platform::Deezer));
        assert_eq!(
            availability.url(Platform::Tidal),
            Some("https://listen.tidal.com/track/1")
        );
        assert_eq!(
            availability.backends(),
            vec![BackendKind::Tidal, BackendKind::Amazon]
        );
    }

    #[test]
    fn known_isrc_makes_qobuz_reachable() {
        let without = Availability::from_links(id(), None, &raw(&[]));
        assert!(without.backends().is_empty());

        let with = Availability::from_links(
            id(),
            Some(Isrc::parse("USRC17607839").unwrap()),
            &raw(&[]),
        );
        assert!(with.has_backend(BackendKind::Qobuz));
        assert!(!with.is_available(Platform::Qobuz));
        assert_eq!(with.backends(), vec![BackendKind::Qobuz]);
    }

    #[test]
    fn backend_platform_names() {
        assert_eq!(Platform::from(BackendKind::Amazon), Platform::AmazonMusic);
        assert_eq!(Platform::AmazonMusic.to_string(), "Amazon Music");
        assert_eq!(Platform::YoutubeMusic.link_key(), "youtubeMusic");
    }
}
