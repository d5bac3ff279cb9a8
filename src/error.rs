//! Error types for lossless-dl
//!
//! This module provides the error handling for the library:
//! - The top-level [`Error`] enum returned by fallible operations
//! - [`BackendError`], the failure shape reported by back-end capabilities
//! - [`DatabaseError`] for the history store
//! - [`ErrorKind`], a flat machine-readable classification carried on
//!   [`DownloadOutcome`](crate::types::DownloadOutcome) values

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::types::ReferenceId;

/// Result type alias for lossless-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for lossless-dl
#[derive(Debug, Error)]
pub enum Error {
    /// The ISRC could not be resolved and the selected back-end requires one
    #[error("identity unresolved for {reference_id}: {reason}")]
    IdentityUnresolved {
        /// Reference-catalog ID of the track
        reference_id: ReferenceId,
        /// Why the cross-catalog lookup failed
        reason: String,
    },

    /// The requested back-end name is not part of the fixed set
    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    /// A back-end capability failed to fetch the track
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// I/O error (planning-time metadata lookup, cleanup)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "filename_format")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Network error talking to a lookup service
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing audio tags failed
    #[error("tag error: {0}")]
    Tag(#[from] lofty::error::LoftyError),

    /// Input is not a reference-catalog track ID, URL or URI
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// Value is not a well-formed ISRC
    #[error("invalid ISRC: {0}")]
    InvalidIsrc(String),

    /// The metadata provider could not describe the track
    #[error("metadata error: {0}")]
    Metadata(String),

    /// No lyrics source had lyrics for the track
    #[error("no lyrics found for {artist} - {title}")]
    LyricsNotFound {
        /// Track title used for the lookup
        title: String,
        /// Artist used for the lookup
        artist: String,
    },
}

/// Failure reported by a back-end capability
///
/// A capability may have started writing the output file before failing;
/// `partial_path` tells the executor which file to remove.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
    /// Human-readable failure description
    pub message: String,
    /// File the back-end left behind, if any
    pub partial_path: Option<PathBuf>,
}

impl BackendError {
    /// Create a failure that left nothing on disk
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            partial_path: None,
        }
    }

    /// Create a failure that left a (possibly truncated) file behind
    pub fn with_partial(message: impl Into<String>, partial_path: impl Into<PathBuf>) -> Self {
        Self {
            message: message.into(),
            partial_path: Some(partial_path.into()),
        }
    }
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Flat classification of an [`Error`]
///
/// Outcomes carry this next to the human-readable message so callers can
/// branch without string matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// ISRC lookup failed for a by-ISRC back-end
    IdentityUnresolved,
    /// Back-end name outside the fixed set
    UnknownBackend,
    /// The back-end capability failed
    BackendFailure,
    /// Filesystem failure during planning or cleanup
    IoFailure,
    /// Invalid configuration
    Config,
    /// History store failure
    Database,
    /// Lookup service network failure
    Network,
    /// Encoding/decoding failure
    Serialization,
    /// Tag read/write failure
    Tag,
    /// Unparseable reference-catalog input
    InvalidReference,
    /// Malformed ISRC
    InvalidIsrc,
    /// Metadata provider failure
    Metadata,
    /// Lyrics lookup came back empty
    LyricsNotFound,
}

impl ErrorKind {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::IdentityUnresolved => "identity_unresolved",
            ErrorKind::UnknownBackend => "unknown_backend",
            ErrorKind::BackendFailure => "backend_failure",
            ErrorKind::IoFailure => "io_failure",
            ErrorKind::Config => "config_error",
            ErrorKind::Database => "database_error",
            ErrorKind::Network => "network_error",
            ErrorKind::Serialization => "serialization_error",
            ErrorKind::Tag => "tag_error",
            ErrorKind::InvalidReference => "invalid_reference",
            ErrorKind::InvalidIsrc => "invalid_isrc",
            ErrorKind::Metadata => "metadata_error",
            ErrorKind::LyricsNotFound => "lyrics_not_found",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::IdentityUnresolved { .. } => ErrorKind::IdentityUnresolved,
            Error::UnknownBackend(_) => ErrorKind::UnknownBackend,
            Error::Backend(_) => ErrorKind::BackendFailure,
            Error::Io(_) => ErrorKind::IoFailure,
            Error::Config { .. } => ErrorKind::Config,
            Error::Database(_) | Error::Sqlx(_) => ErrorKind::Database,
            Error::Network(_) => ErrorKind::Network,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Tag(_) => ErrorKind::Tag,
            Error::InvalidReference(_) => ErrorKind::InvalidReference,
            Error::InvalidIsrc(_) => ErrorKind::InvalidIsrc,
            Error::Metadata(_) => ErrorKind::Metadata,
            Error::LyricsNotFound { .. } => ErrorKind::LyricsNotFound,
        }
    }

    /// Whether this error is raised before any network or filesystem work
    pub fn is_short_circuit(&self) -> bool {
        matches!(
            self,
            Error::IdentityUnresolved { .. } | Error::UnknownBackend(_)
        )
    }
}
