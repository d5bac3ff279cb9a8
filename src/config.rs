//! Configuration types for lossless-dl

use crate::backend::{BackendKind, Quality, ServiceSelection};
use crate::error::{Error, Result};
use crate::planner::{FilenameFormat, FolderTemplate};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Download behavior configuration (output layout, toggles, defaults)
///
/// These values seed [`DownloadPreferences`](crate::types::DownloadPreferences);
/// every field can be overridden per request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Output directory (default: "./downloads")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Back-end name or "auto" (default: "auto")
    #[serde(default = "default_service")]
    pub service: String,

    /// Quality token applied to every back-end (None = per-back-end default)
    #[serde(default)]
    pub quality: Option<String>,

    /// File name layout (default: title-artist)
    #[serde(default)]
    pub filename_format: FilenameFormat,

    /// Folder layout (default: none)
    #[serde(default)]
    pub folder_template: FolderTemplate,

    /// Prefix file names with a track number
    #[serde(default)]
    pub track_number: bool,

    /// Number files by album track number instead of caller position
    #[serde(default)]
    pub use_album_track_number: bool,

    /// Embed lyrics after fresh downloads
    #[serde(default)]
    pub embed_lyrics: bool,

    /// Ask back-ends for the largest cover
    #[serde(default)]
    pub embed_max_quality_cover: bool,

    /// Smallest file size (bytes) treated as a complete prior download (default: 100 KiB)
    ///
    /// Files at the planned path that are this size or smaller are considered
    /// truncated and downloaded again.
    #[serde(default = "default_min_existing_size")]
    pub min_existing_size_bytes: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            service: default_service(),
            quality: None,
            filename_format: FilenameFormat::default(),
            folder_template: FolderTemplate::default(),
            track_number: false,
            use_album_track_number: false,
            embed_lyrics: false,
            embed_max_quality_cover: false,
            min_existing_size_bytes: default_min_existing_size(),
        }
    }
}

/// Back-end selection and per-back-end defaults
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendsConfig {
    /// Back-end used when the request says "auto" (default: tidal)
    #[serde(default = "default_auto_backend")]
    pub auto_backend: BackendKind,

    /// Tidal API endpoint override (None = back-end picks)
    #[serde(default)]
    pub tidal_api_url: Option<String>,

    /// Default Tidal quality (LOSSLESS | HI_RES_LOSSLESS)
    #[serde(default = "default_tidal_quality")]
    pub tidal_quality: String,

    /// Default Qobuz quality (6 | 7)
    #[serde(default = "default_qobuz_quality")]
    pub qobuz_quality: String,

    /// Default Amazon quality (original)
    #[serde(default = "default_amazon_quality")]
    pub amazon_quality: String,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            auto_backend: default_auto_backend(),
            tidal_api_url: None,
            tidal_quality: default_tidal_quality(),
            qobuz_quality: default_qobuz_quality(),
            amazon_quality: default_amazon_quality(),
        }
    }
}

impl BackendsConfig {
    /// Configured default quality token for a back-end
    pub fn default_quality(&self, kind: BackendKind) -> &str {
        match kind {
            BackendKind::Tidal => &self.tidal_quality,
            BackendKind::Qobuz => &self.qobuz_quality,
            BackendKind::Amazon => &self.amazon_quality,
        }
    }
}

/// Cross-catalog ISRC lookup (song.link → Deezer)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// song.link API base URL
    #[serde(default = "default_songlink_url")]
    pub songlink_url: String,

    /// Deezer API base URL
    #[serde(default = "default_deezer_url")]
    pub deezer_url: String,

    /// Country hint sent to song.link
    #[serde(default = "default_user_country")]
    pub user_country: String,

    /// Per-request timeout in seconds (default: 15)
    #[serde(default = "default_lookup_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            songlink_url: default_songlink_url(),
            deezer_url: default_deezer_url(),
            user_country: default_user_country(),
            timeout: default_lookup_timeout(),
        }
    }
}

/// Lyrics lookup configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LyricsConfig {
    /// Query LRCLIB (default: true)
    ///
    /// With every source disabled, lyrics embedding is skipped even when a
    /// request asks for it.
    #[serde(default = "default_true")]
    pub lrclib_enabled: bool,

    /// LRCLIB base URL
    #[serde(default = "default_lrclib_url")]
    pub lrclib_url: String,

    /// Per-request timeout in seconds (default: 15)
    #[serde(default = "default_lookup_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            lrclib_enabled: true,
            lrclib_url: default_lrclib_url(),
            timeout: default_lookup_timeout(),
        }
    }
}

/// Background side-effect tasks (lyrics embedding, history append)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SideEffectConfig {
    /// Maximum side-effect tasks running at once (default: 4)
    #[serde(default = "default_max_side_effects")]
    pub max_concurrent: usize,

    /// How long shutdown waits for running tasks before abandoning them (default: 10s)
    #[serde(default = "default_drain_timeout", with = "duration_serde")]
    pub drain_timeout: Duration,
}

impl Default for SideEffectConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_side_effects(),
            drain_timeout: default_drain_timeout(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// History database path (default: "./lossless-dl.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Main configuration for LosslessDownloader
///
/// Fields are organized into logical sub-configs:
/// - [`download`](DownloadConfig) - output layout and request defaults
/// - [`backends`](BackendsConfig) - auto selection and quality defaults
/// - [`identity`](IdentityConfig) - ISRC lookup services
/// - [`lyrics`](LyricsConfig) - lyrics lookup services
/// - [`side_effects`](SideEffectConfig) - background task limits
/// - [`persistence`](PersistenceConfig) - history database
///
/// `download` is flattened, so its keys sit at the top level of the
/// serialized form.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// Back-end selection and quality defaults
    #[serde(default)]
    pub backends: BackendsConfig,

    /// ISRC lookup services
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Lyrics lookup services
    #[serde(default)]
    pub lyrics: LyricsConfig,

    /// Background task limits
    #[serde(default)]
    pub side_effects: SideEffectConfig,

    /// History database
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Config {
    /// Output directory
    pub fn output_dir(&self) -> &PathBuf {
        &self.download.output_dir
    }

    /// Check every value a caller could have set by hand
    ///
    /// Returns the first problem found as [`Error::Config`] with the offending key.
    pub fn validate(&self) -> Result<()> {
        self.download
            .service
            .parse::<ServiceSelection>()
            .map_err(|_| {
                config_error(
                    "service",
                    format!(
                        "invalid service: {} (must be: auto, tidal, qobuz, amazon)",
                        self.download.service
                    ),
                )
            })?;

        for kind in BackendKind::ALL {
            let token = self.backends.default_quality(kind);
            if !Quality::is_valid_for(kind, token) {
                return Err(config_error(
                    &format!("{kind}_quality"),
                    format!(
                        "invalid {kind} quality: {token} (must be: {})",
                        Quality::vocabulary(kind).join(" or ")
                    ),
                ));
            }
        }

        if let Some(api_url) = &self.backends.tidal_api_url
            && api_url != "auto"
        {
            url::Url::parse(api_url).map_err(|e| {
                config_error("tidal_api_url", format!("invalid Tidal API URL: {e}"))
            })?;
        }

        for (key, value) in [
            ("songlink_url", &self.identity.songlink_url),
            ("deezer_url", &self.identity.deezer_url),
            ("lrclib_url", &self.lyrics.lrclib_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| config_error(key, format!("invalid URL {value}: {e}")))?;
        }

        if self.side_effects.max_concurrent == 0 {
            return Err(config_error(
                "max_concurrent",
                "side-effect concurrency must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn config_error(key: &str, message: String) -> Error {
    Error::Config {
        message,
        key: Some(key.to_string()),
    }
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_service() -> String {
    "auto".to_string()
}

fn default_min_existing_size() -> u64 {
    100 * 1024
}

fn default_auto_backend() -> BackendKind {
    BackendKind::Tidal
}

fn default_tidal_quality() -> String {
    "LOSSLESS".to_string()
}

fn default_qobuz_quality() -> String {
    "6".to_string()
}

fn default_amazon_quality() -> String {
    "original".to_string()
}

fn default_songlink_url() -> String {
    "https://api.song.link".to_string()
}

fn default_deezer_url() -> String {
    "https://api.deezer.com".to_string()
}

fn default_user_country() -> String {
    "US".to_string()
}

fn default_lrclib_url() -> String {
    "https://lrclib.net".to_string()
}

fn default_lookup_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_max_side_effects() -> usize {
    4
}

fn default_drain_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./lossless-dl.db")
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
