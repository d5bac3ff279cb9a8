//! Core types for lossless-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::backend::BackendKind;
use crate::config::Config;
use crate::error::{Error, ErrorKind};
use crate::planner::{FilenameFormat, FolderTemplate};

/// Length of a reference-catalog (Spotify) track ID
const REFERENCE_ID_LEN: usize = 22;

/// Host serving reference-catalog track pages
const REFERENCE_HOST: &str = "open.spotify.com";

/// Reference-catalog track identifier (a 22-character base-62 Spotify ID)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferenceId(String);

impl ReferenceId {
    /// Parse a bare ID, a track URL or a `spotify:track:` URI
    ///
    /// # Examples
    ///
    /// ```
    /// use lossless_dl::ReferenceId;
    ///
    /// let id = ReferenceId::parse("https://open.spotify.com/track/4cOdK2wGLETKBW3PvgPWqT?si=abc").unwrap();
    /// assert_eq!(id.as_str(), "4cOdK2wGLETKBW3PvgPWqT");
    /// assert!(ReferenceId::parse("not an id").is_err());
    /// ```
    pub fn parse(input: &str) -> crate::Result<Self> {
        let input = input.trim();

        let candidate = if let Some(rest) = input.strip_prefix("spotify:track:") {
            rest.to_string()
        } else if input.contains(REFERENCE_HOST) {
            Self::id_from_url(input)?
        } else {
            input.to_string()
        };

        if candidate.len() != REFERENCE_ID_LEN
            || !candidate.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(Error::InvalidReference(format!(
                "{input:?} is not a {REFERENCE_ID_LEN}-character track ID"
            )));
        }

        Ok(Self(candidate))
    }

    fn id_from_url(input: &str) -> crate::Result<String> {
        let with_scheme = if input.starts_with("http://") || input.starts_with("https://") {
            input.to_string()
        } else {
            format!("https://{input}")
        };

        let url = url::Url::parse(&with_scheme)
            .map_err(|e| Error::InvalidReference(format!("{input:?}: {e}")))?;

        // Paths look like /track/<id> or /intl-de/track/<id>
        let mut segments = url
            .path_segments()
            .ok_or_else(|| Error::InvalidReference(format!("{input:?} has no path")))?;

        segments
            .by_ref()
            .find(|s| *s == "track")
            .and_then(|_| segments.next())
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidReference(format!("{input:?} is not a track URL")))
    }

    /// The ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical track page URL, as handed to lookup services and back-ends
    pub fn canonical_url(&self) -> String {
        format!("https://{REFERENCE_HOST}/track/{}", self.0)
    }
}

impl std::fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ReferenceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ReferenceId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReferenceId> for String {
    fn from(id: ReferenceId) -> Self {
        id.0
    }
}

/// International Standard Recording Code, normalized to 12 upper-case characters
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isrc(String);

impl Isrc {
    /// Normalize and validate an ISRC
    ///
    /// Hyphens and whitespace are dropped and letters upper-cased, so
    /// `us-rc1-76-07839` and `USRC17607839` are the same code.
    pub fn parse(input: &str) -> crate::Result<Self> {
        let normalized: String = input
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .map(|c| c.to_ascii_uppercase())
            .collect();

        let well_formed = normalized.len() == 12
            && normalized.chars().all(|c| c.is_ascii_alphanumeric())
            && normalized.chars().take(2).all(|c| c.is_ascii_alphabetic());

        if !well_formed {
            return Err(Error::InvalidIsrc(input.to_string()));
        }

        Ok(Self(normalized))
    }

    /// The code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Isrc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Isrc {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Isrc {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Isrc> for String {
    fn from(isrc: Isrc) -> Self {
        isrc.0
    }
}

/// Everything known about a track, as reported by the metadata provider
///
/// The ISRC is write-once: [`with_isrc`](Self::with_isrc) fills it if it is
/// missing and otherwise leaves the known code in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackIdentity {
    /// Reference-catalog track ID
    pub reference_id: ReferenceId,
    isrc: Option<Isrc>,
    /// Track title
    pub title: String,
    /// Primary artist (may be a comma-separated list)
    pub artist: String,
    /// Album name
    pub album: String,
    /// Album artist
    pub album_artist: String,
    /// Release date (`YYYY`, `YYYY-MM` or `YYYY-MM-DD`)
    pub release_date: String,
    /// Disc number (1-based, 0 when unknown)
    pub disc_number: u32,
    /// Track number on its disc (1-based, 0 when unknown)
    pub track_number: u32,
    /// Number of discs in the release
    pub total_discs: u32,
    /// Number of tracks in the release
    pub total_tracks: u32,
    /// Cover art URL
    pub cover_url: Option<String>,
    /// Copyright line
    pub copyright: Option<String>,
    /// Publisher / label
    pub publisher: Option<String>,
}

impl TrackIdentity {
    /// Create an identity with the required fields; the rest start empty
    pub fn new(
        reference_id: ReferenceId,
        title: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        Self {
            reference_id,
            isrc: None,
            title: title.into(),
            artist: artist.into(),
            album: String::new(),
            album_artist: String::new(),
            release_date: String::new(),
            disc_number: 0,
            track_number: 0,
            total_discs: 0,
            total_tracks: 0,
            cover_url: None,
            copyright: None,
            publisher: None,
        }
    }

    /// The ISRC, if known
    pub fn isrc(&self) -> Option<&Isrc> {
        self.isrc.as_ref()
    }

    /// Return this identity carrying `isrc`, unless one is already set
    #[must_use]
    pub fn with_isrc(mut self, isrc: Isrc) -> Self {
        if self.isrc.is_none() {
            self.isrc = Some(isrc);
        }
        self
    }

    /// Release year, if the release date starts with four digits
    pub fn year(&self) -> Option<&str> {
        let year = self.release_date.get(..4)?;
        year.chars().all(|c| c.is_ascii_digit()).then_some(year)
    }
}

/// Operator preferences for a single download
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadPreferences {
    /// Back-end name (`auto`, `tidal`, `qobuz`, `amazon`)
    pub service: String,
    /// Back-end specific quality token (back-end default when None)
    pub quality: Option<String>,
    /// Base output directory
    pub output_dir: PathBuf,
    /// File name layout
    pub filename_format: FilenameFormat,
    /// Folder layout under `output_dir`
    pub folder_template: FolderTemplate,
    /// Prefix the file name with a track number
    pub track_number: bool,
    /// Position supplied by the caller (e.g. playlist index), 0 when none
    pub position: u32,
    /// Number with the album track number instead of `position`
    pub use_album_track_number: bool,
    /// Fetch and embed lyrics after a fresh download
    pub embed_lyrics: bool,
    /// Ask the back-end to embed the largest available cover
    pub embed_max_quality_cover: bool,
    /// Back-end endpoint override (Tidal API URL)
    pub api_url: Option<String>,
}

impl DownloadPreferences {
    /// Preferences seeded from configured defaults
    pub fn from_config(config: &Config) -> Self {
        let download = &config.download;
        Self {
            service: download.service.clone(),
            quality: download.quality.clone(),
            output_dir: download.output_dir.clone(),
            filename_format: download.filename_format,
            folder_template: download.folder_template,
            track_number: download.track_number,
            position: 0,
            use_album_track_number: download.use_album_track_number,
            embed_lyrics: download.embed_lyrics,
            embed_max_quality_cover: download.embed_max_quality_cover,
            api_url: config.backends.tidal_api_url.clone(),
        }
    }
}

impl Default for DownloadPreferences {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// A track plus the preferences to download it with
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Track to download
    pub identity: TrackIdentity,
    /// How and where to download it
    pub preferences: DownloadPreferences,
}

impl DownloadRequest {
    /// Bundle a track with its preferences
    pub fn new(identity: TrackIdentity, preferences: DownloadPreferences) -> Self {
        Self {
            identity,
            preferences,
        }
    }
}

/// Executor state for a single request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadState {
    /// Output path computed
    Planned,
    /// A plausible file already existed; nothing dispatched
    Skipped,
    /// Waiting on the back-end
    Dispatching,
    /// Back-end produced the file
    Succeeded,
    /// Request failed (after cleanup)
    Failed,
}

/// The single result of [`LosslessDownloader::execute`](crate::LosslessDownloader::execute)
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    /// Whether a usable file is now on disk
    pub success: bool,
    /// Human-readable summary
    pub message: String,
    /// Final file path (None on failure)
    pub file: Option<PathBuf>,
    /// Human-readable error (failure only)
    pub error: Option<String>,
    /// Error classification (failure only)
    pub error_kind: Option<ErrorKind>,
    /// The file was already present; nothing new was written
    pub already_exists: bool,
    /// Back-end that served the request, if one was contacted
    pub backend: Option<BackendKind>,
    /// Terminal state the request ended in
    pub state: DownloadState,
}

impl DownloadOutcome {
    /// A plausible file was found at the planned path
    pub fn skipped(path: PathBuf) -> Self {
        Self {
            success: true,
            message: "File already exists".to_string(),
            file: Some(path),
            error: None,
            error_kind: None,
            already_exists: true,
            backend: None,
            state: DownloadState::Skipped,
        }
    }

    /// The back-end wrote a new file
    pub fn downloaded(path: PathBuf, backend: BackendKind) -> Self {
        Self {
            success: true,
            message: "Download completed successfully".to_string(),
            file: Some(path),
            error: None,
            error_kind: None,
            already_exists: false,
            backend: Some(backend),
            state: DownloadState::Succeeded,
        }
    }

    /// The back-end reported the file was already present on its side
    pub fn existing_on_backend(path: PathBuf, backend: BackendKind) -> Self {
        Self {
            already_exists: true,
            message: "File already exists".to_string(),
            ..Self::downloaded(path, backend)
        }
    }

    /// The request failed
    pub fn failed(error: &Error, backend: Option<BackendKind>) -> Self {
        Self {
            success: false,
            message: "Download failed".to_string(),
            file: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            already_exists: false,
            backend,
            state: DownloadState::Failed,
        }
    }

    /// Whether this outcome triggers history and lyrics work
    pub fn is_fresh_download(&self) -> bool {
        self.success && !self.already_exists
    }
}

/// Audit record appended once per fresh download
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    /// Reference-catalog track ID
    pub reference_id: String,
    /// ISRC, when it was resolved
    pub isrc: Option<String>,
    /// Track title
    pub title: String,
    /// Artists
    pub artists: String,
    /// Album name
    pub album: String,
    /// Cover art URL
    pub cover_url: Option<String>,
    /// Quality token the back-end was asked for
    pub quality: String,
    /// Container format label (e.g. `FLAC`)
    pub format: String,
    /// Back-end that produced the file
    pub backend: String,
    /// Where the file was written
    pub path: PathBuf,
}

impl HistoryItem {
    /// Build the record for a finished download
    pub fn for_download(
        identity: &TrackIdentity,
        path: &Path,
        backend: BackendKind,
        quality: &str,
    ) -> Self {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_uppercase)
            .unwrap_or_else(|| "Unknown".to_string());

        Self {
            reference_id: identity.reference_id.to_string(),
            isrc: identity.isrc().map(|i| i.to_string()),
            title: identity.title.clone(),
            artists: identity.artist.clone(),
            album: identity.album.clone(),
            cover_url: identity.cover_url.clone(),
            quality: quality.to_string(),
            format,
            backend: backend.to_string(),
            path: path.to_path_buf(),
        }
    }
}

/// Stored history record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Row ID
    pub id: i64,
    /// Reference-catalog track ID
    pub reference_id: String,
    /// ISRC, when it was resolved
    pub isrc: Option<String>,
    /// Track title
    pub title: String,
    /// Artists
    pub artists: String,
    /// Album name
    pub album: String,
    /// Cover art URL
    pub cover_url: Option<String>,
    /// Quality token
    pub quality: String,
    /// Container format label
    pub format: String,
    /// Back-end that produced the file
    pub backend: String,
    /// Where the file was written
    pub path: PathBuf,
    /// When the record was appended
    pub created_at: DateTime<Utc>,
}

/// Event emitted while executing requests and their side effects
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Output path computed
    Planned {
        /// Track being processed
        reference_id: ReferenceId,
        /// Planned output path
        path: PathBuf,
    },

    /// Plausible file already on disk; no back-end contacted
    Skipped {
        /// Track being processed
        reference_id: ReferenceId,
        /// Existing file
        path: PathBuf,
    },

    /// Request handed to a back-end
    Dispatching {
        /// Track being processed
        reference_id: ReferenceId,
        /// Selected back-end
        backend: BackendKind,
    },

    /// Back-end finished successfully
    Downloaded {
        /// Track being processed
        reference_id: ReferenceId,
        /// Final file path
        path: PathBuf,
        /// The back-end reported the file already existed
        already_exists: bool,
    },

    /// Request failed
    Failed {
        /// Track being processed
        reference_id: ReferenceId,
        /// Error classification
        kind: ErrorKind,
        /// Error message
        error: String,
    },

    /// Lyrics written into the audio file
    LyricsEmbedded {
        /// Audio file
        path: PathBuf,
        /// Lyrics source name
        source: String,
    },

    /// No lyrics were available
    LyricsSkipped {
        /// Audio file
        path: PathBuf,
        /// Why nothing was embedded
        reason: String,
    },

    /// Lyrics lookup or embedding failed
    LyricsFailed {
        /// Audio file
        path: PathBuf,
        /// Error message
        error: String,
    },

    /// History record appended
    HistoryRecorded {
        /// Row ID of the new record
        id: i64,
        /// Recorded file path
        path: PathBuf,
    },

    /// History append failed
    HistoryFailed {
        /// File that was not recorded
        path: PathBuf,
        /// Error message
        error: String,
    },

    /// Downloader shut down
    Shutdown,
}

impl Event {
    /// Executor state this event announces, for request events
    ///
    /// Side-effect and lifecycle events return None.
    pub fn state(&self) -> Option<DownloadState> {
        match self {
            Event::Planned { .. } => Some(DownloadState::Planned),
            Event::Skipped { .. } => Some(DownloadState::Skipped),
            Event::Dispatching { .. } => Some(DownloadState::Dispatching),
            Event::Downloaded { .. } => Some(DownloadState::Succeeded),
            Event::Failed { .. } => Some(DownloadState::Failed),
            _ => None,
        }
    }
}
