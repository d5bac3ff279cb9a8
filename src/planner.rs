//! Output path planning
//!
//! [`plan`] is a pure function of the track metadata and the naming
//! preferences: the same inputs always produce the same path, which is what
//! makes the idempotency check in the executor work.

use crate::types::{DownloadPreferences, TrackIdentity};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Extension of every planned file
pub const OUTPUT_EXTENSION: &str = "flac";

/// Maximum length of a single path component, in bytes
const MAX_COMPONENT_BYTES: usize = 200;

/// Placeholder for empty metadata fields
const UNKNOWN: &str = "Unknown";

/// Placeholder for a missing release year
const UNKNOWN_YEAR: &str = "Unknown Year";

/// Characters that are invalid in file names on at least one common filesystem
const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// File name layout
///
/// Unknown names parse to the default ([`FilenameFormat::TitleArtist`]), so a
/// stale configuration value never breaks planning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilenameFormat {
    /// `{title}`
    Title,
    /// `{title} - {artist}`
    #[default]
    TitleArtist,
    /// `{artist} - {title}`
    ArtistTitle,
    /// `{NN}. {title}`
    TrackTitle,
    /// `{artist} - {album} - {title}`
    ArtistAlbumTitle,
}

impl FilenameFormat {
    /// Every layout, in documentation order
    pub const ALL: [FilenameFormat; 5] = [
        FilenameFormat::Title,
        FilenameFormat::TitleArtist,
        FilenameFormat::ArtistTitle,
        FilenameFormat::TrackTitle,
        FilenameFormat::ArtistAlbumTitle,
    ];

    /// Configuration name of this layout
    pub fn as_str(&self) -> &'static str {
        match self {
            FilenameFormat::Title => "title",
            FilenameFormat::TitleArtist => "title-artist",
            FilenameFormat::ArtistTitle => "artist-title",
            FilenameFormat::TrackTitle => "track-title",
            FilenameFormat::ArtistAlbumTitle => "artist-album-title",
        }
    }

    /// Look up a layout by its configuration name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(name))
    }
}

impl From<String> for FilenameFormat {
    fn from(name: String) -> Self {
        Self::from_name(&name).unwrap_or_else(|| {
            tracing::warn!(value = %name, "unknown filename format, using title-artist");
            Self::default()
        })
    }
}

impl From<FilenameFormat> for String {
    fn from(format: FilenameFormat) -> Self {
        format.as_str().to_string()
    }
}

impl std::fmt::Display for FilenameFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Folder layout under the output directory
///
/// Unknown names parse to [`FolderTemplate::None`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FolderTemplate {
    /// Files directly in the output directory
    #[default]
    None,
    /// `{artist}/`
    Artist,
    /// `{album}/`
    Album,
    /// `{artist}/{album}/`
    ArtistAlbum,
    /// `{year}/`
    Year,
    /// `{year}/{album}/`
    YearAlbum,
    /// `{year}/{artist}/`
    YearArtist,
    /// `{year}/{artist}/{album}/`
    YearArtistAlbum,
    /// `{album artist}/`
    AlbumArtist,
    /// `{album artist}/{album}/`
    AlbumArtistAlbum,
    /// `{album artist}/{year}/{album}/`
    AlbumArtistYearAlbum,
}

/// One directory level of a folder layout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Segment {
    Artist,
    AlbumArtist,
    Album,
    Year,
}

impl FolderTemplate {
    /// Every layout, in documentation order
    pub const ALL: [FolderTemplate; 11] = [
        FolderTemplate::None,
        FolderTemplate::Artist,
        FolderTemplate::Album,
        FolderTemplate::ArtistAlbum,
        FolderTemplate::Year,
        FolderTemplate::YearAlbum,
        FolderTemplate::YearArtist,
        FolderTemplate::YearArtistAlbum,
        FolderTemplate::AlbumArtist,
        FolderTemplate::AlbumArtistAlbum,
        FolderTemplate::AlbumArtistYearAlbum,
    ];

    /// Configuration name of this layout
    pub fn as_str(&self) -> &'static str {
        match self {
            FolderTemplate::None => "none",
            FolderTemplate::Artist => "artist",
            FolderTemplate::Album => "album",
            FolderTemplate::ArtistAlbum => "artist-album",
            FolderTemplate::Year => "year",
            FolderTemplate::YearAlbum => "year-album",
            FolderTemplate::YearArtist => "year-artist",
            FolderTemplate::YearArtistAlbum => "year-artist-album",
            FolderTemplate::AlbumArtist => "album-artist",
            FolderTemplate::AlbumArtistAlbum => "album-artist-album",
            FolderTemplate::AlbumArtistYearAlbum => "album-artist-year-album",
        }
    }

    /// Look up a layout by its configuration name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
    }

    fn segments(&self) -> &'static [Segment] {
        use Segment::*;
        match self {
            FolderTemplate::None => &[],
            FolderTemplate::Artist => &[Artist],
            FolderTemplate::Album => &[Album],
            FolderTemplate::ArtistAlbum => &[Artist, Album],
            FolderTemplate::Year => &[Year],
            FolderTemplate::YearAlbum => &[Year, Album],
            FolderTemplate::YearArtist => &[Year, Artist],
            FolderTemplate::YearArtistAlbum => &[Year, Artist, Album],
            FolderTemplate::AlbumArtist => &[AlbumArtist],
            FolderTemplate::AlbumArtistAlbum => &[AlbumArtist, Album],
            FolderTemplate::AlbumArtistYearAlbum => &[AlbumArtist, Year, Album],
        }
    }
}

impl From<String> for FolderTemplate {
    fn from(name: String) -> Self {
        Self::from_name(&name).unwrap_or_else(|| {
            tracing::warn!(value = %name, "unknown folder template, using none");
            Self::default()
        })
    }
}

impl From<FolderTemplate> for String {
    fn from(template: FolderTemplate) -> Self {
        template.as_str().to_string()
    }
}

impl std::fmt::Display for FolderTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute the final file path for a track
///
/// # Arguments
///
/// * `identity` - Track metadata
/// * `prefs` - Output directory and naming preferences
///
/// # Returns
///
/// `output_dir / folder segments... / file name.flac`. Every component is
/// sanitized, so the result is safe to create on any common filesystem.
///
/// # Examples
///
/// ```
/// use lossless_dl::planner::{plan, FolderTemplate};
/// use lossless_dl::{DownloadPreferences, TrackIdentity};
/// use std::path::PathBuf;
///
/// let mut identity = TrackIdentity::new("4cOdK2wGLETKBW3PvgPWqT".parse().unwrap(), "Song", "Band");
/// identity.album = "Record".into();
///
/// let mut prefs = DownloadPreferences::default();
/// prefs.output_dir = PathBuf::from("/music");
/// prefs.folder_template = FolderTemplate::ArtistAlbum;
///
/// assert_eq!(plan(&identity, &prefs), PathBuf::from("/music/Band/Record/Song - Band.flac"));
/// ```
pub fn plan(identity: &TrackIdentity, prefs: &DownloadPreferences) -> PathBuf {
    let mut path = prefs.output_dir.clone();

    for segment in prefs.folder_template.segments() {
        path.push(folder_segment(identity, *segment));
    }

    path.push(format!("{}.{OUTPUT_EXTENSION}", file_stem(identity, prefs)));
    path
}

/// File name without extension
pub fn file_stem(identity: &TrackIdentity, prefs: &DownloadPreferences) -> String {
    let title = field(&identity.title);
    let artist = field(&identity.artist);
    let number = track_prefix(identity, prefs);

    let base = match prefs.filename_format {
        FilenameFormat::Title => title,
        FilenameFormat::TitleArtist => format!("{title} - {artist}"),
        FilenameFormat::ArtistTitle => format!("{artist} - {title}"),
        FilenameFormat::TrackTitle => match &number {
            Some(n) => return sanitize(&format!("{n}. {title}")),
            None => format!("{title} - {artist}"),
        },
        FilenameFormat::ArtistAlbumTitle => {
            format!("{artist} - {} - {title}", field(&identity.album))
        }
    };

    let stem = match number.filter(|_| prefs.track_number) {
        Some(n) => format!("{n}. {base}"),
        None => base,
    };

    sanitize(&stem)
}

/// Track number prefix (without the trailing `. `), None when there is no number
///
/// The `track-title` layout always numbers; other layouts only when the
/// `track_number` toggle is on. The caller handles that distinction.
fn track_prefix(identity: &TrackIdentity, prefs: &DownloadPreferences) -> Option<String> {
    let number = if prefs.use_album_track_number {
        identity.track_number
    } else {
        prefs.position
    };

    if number == 0 {
        return None;
    }

    if prefs.use_album_track_number && identity.disc_number > 1 {
        Some(format!("{}-{number:02}", identity.disc_number))
    } else {
        Some(format!("{number:02}"))
    }
}

fn folder_segment(identity: &TrackIdentity, segment: Segment) -> String {
    match segment {
        Segment::Artist => field(&identity.artist),
        Segment::AlbumArtist => {
            if identity.album_artist.trim().is_empty() {
                field(&identity.artist)
            } else {
                field(&identity.album_artist)
            }
        }
        Segment::Album => field(&identity.album),
        Segment::Year => identity.year().unwrap_or(UNKNOWN_YEAR).to_string(),
    }
}

/// Sanitized metadata field
fn field(value: &str) -> String {
    sanitize(value)
}

/// Make a string safe to use as a single path component
///
/// Strips filesystem-hostile characters and control characters, collapses
/// runs of whitespace, trims trailing dots and spaces, and caps the length at
/// 200 bytes. An empty result becomes `Unknown`.
///
/// # Examples
///
/// ```
/// use lossless_dl::planner::sanitize;
///
/// assert_eq!(sanitize("AC/DC: Live?"), "ACDC Live");
/// assert_eq!(sanitize("  ...  "), "Unknown");
/// ```
pub fn sanitize(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c) && (c.is_whitespace() || !c.is_control()))
        .collect();

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated = truncate_on_char_boundary(&collapsed, MAX_COMPONENT_BYTES);
    let trimmed = truncated.trim_end_matches(['.', ' ']).trim_start();

    if trimmed.is_empty() {
        UNKNOWN.to_string()
    } else {
        trimmed.to_string()
    }
}

fn truncate_on_char_boundary(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
