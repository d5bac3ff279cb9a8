//! Capability traits and the values they exchange with the engine

use crate::error::BackendError;
use crate::planner::FilenameFormat;
use crate::types::{Isrc, ReferenceId, TrackIdentity};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Prefix some back-ends put in front of a path to say "this was already here"
pub const EXISTS_MARKER: &str = "EXISTS:";

/// Everything a capability needs to produce the file
#[derive(Clone, Debug)]
pub struct FetchParams {
    /// Track metadata (carries the ISRC for by-ISRC back-ends)
    pub identity: TrackIdentity,
    /// Path the engine expects the file at
    pub target: PathBuf,
    /// Directory the file goes in (the target's parent)
    pub output_dir: PathBuf,
    /// Quality token in the back-end's own vocabulary
    pub quality: String,
    /// File name layout, for back-ends that name files themselves
    pub filename_format: FilenameFormat,
    /// Prefix the file name with a track number
    pub track_number: bool,
    /// Caller-supplied position
    pub position: u32,
    /// Number by album track number instead of position
    pub use_album_track_number: bool,
    /// Embed the largest cover available
    pub embed_max_quality_cover: bool,
    /// Endpoint override (Tidal)
    pub api_url: Option<String>,
    /// Canonical reference-catalog track URL
    pub reference_url: String,
}

/// What a capability produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchResult {
    /// A new file was written
    Downloaded(PathBuf),
    /// The back-end found the file already present and wrote nothing
    AlreadyExists(PathBuf),
}

impl FetchResult {
    /// Decode a path that may carry [`EXISTS_MARKER`]
    ///
    /// For capabilities that report "already there" in-band. The marker is
    /// stripped, so it never reaches a caller.
    ///
    /// ```
    /// use lossless_dl::backend::FetchResult;
    /// use std::path::PathBuf;
    ///
    /// assert_eq!(
    ///     FetchResult::from_marked_path("EXISTS:/music/a.flac"),
    ///     FetchResult::AlreadyExists(PathBuf::from("/music/a.flac"))
    /// );
    /// ```
    pub fn from_marked_path(raw: &str) -> Self {
        match raw.strip_prefix(EXISTS_MARKER) {
            Some(path) => FetchResult::AlreadyExists(PathBuf::from(path)),
            None => FetchResult::Downloaded(PathBuf::from(raw)),
        }
    }

    /// Path of the file, either way
    pub fn path(&self) -> &Path {
        match self {
            FetchResult::Downloaded(path) | FetchResult::AlreadyExists(path) => path,
        }
    }

    /// Whether the back-end skipped the transfer
    pub fn already_existed(&self) -> bool {
        matches!(self, FetchResult::AlreadyExists(_))
    }
}

/// Back-end that downloads by reference-catalog track ID
///
/// Implementations may perform their own network I/O; the engine adds no
/// timeout or retry around the call. On failure, report any file that was
/// started via [`BackendError::with_partial`] so it can be removed.
#[async_trait]
pub trait FetchByReferenceId: Send + Sync {
    /// Fetch the track into `params.target` (or wherever the back-end decides)
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the back-end cannot deliver the file.
    async fn fetch(
        &self,
        reference_id: &ReferenceId,
        params: &FetchParams,
    ) -> Result<FetchResult, BackendError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Back-end that downloads by ISRC
///
/// The engine resolves the ISRC before calling; an implementation never sees
/// a request without one.
#[async_trait]
pub trait FetchByIsrc: Send + Sync {
    /// Fetch the track identified by `isrc`
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the back-end cannot deliver the file.
    async fn fetch(&self, isrc: &Isrc, params: &FetchParams)
    -> Result<FetchResult, BackendError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
