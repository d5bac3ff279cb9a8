//! Database layer for lossless-dl
//!
//! Handles SQLite persistence for the download history.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`history`] - History append, queries and export

use crate::Result;
use crate::types::{HistoryEntry, HistoryItem};
use async_trait::async_trait;
use sqlx::{FromRow, sqlite::SqlitePool};
use std::path::PathBuf;

mod history;
mod migrations;

/// Append-only sink for history records
///
/// The downloader writes one record per fresh download through this trait;
/// [`Database`] is the stock implementation.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a record, returning its ID
    async fn append(&self, item: &HistoryItem) -> Result<i64>;
}

#[async_trait]
impl HistoryStore for Database {
    async fn append(&self, item: &HistoryItem) -> Result<i64> {
        self.insert_history(item).await
    }
}

/// History record from database (raw from SQLite)
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    /// Unique database ID
    pub id: i64,
    /// Reference-catalog track ID
    pub reference_id: String,
    /// ISRC, if it was resolved
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
    /// Back-end name
    pub backend: String,
    /// File path
    pub path: String,
    /// Unix timestamp when the record was appended
    pub created_at: i64,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        use chrono::{TimeZone, Utc};

        HistoryEntry {
            id: row.id,
            reference_id: row.reference_id,
            isrc: row.isrc,
            title: row.title,
            artists: row.artists,
            album: row.album,
            cover_url: row.cover_url,
            quality: row.quality,
            format: row.format,
            backend: row.backend,
            path: PathBuf::from(row.path),
            created_at: Utc
                .timestamp_opt(row.created_at, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }
}

/// Database handle for lossless-dl
pub struct Database {
    pool: SqlitePool,
}
