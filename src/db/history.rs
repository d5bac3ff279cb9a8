//! History management operations.

use crate::error::DatabaseError;
use crate::types::{HistoryEntry, HistoryItem};
use crate::{Error, Result};
use std::path::Path;

use super::{Database, HistoryRow};

const HISTORY_COLUMNS: &str = "id, reference_id, isrc, title, artists, album, cover_url, \
                               quality, format, backend, path, created_at";

impl Database {
    /// Append a download to history
    ///
    /// Called once per fresh download; returns the new row ID. Paths are
    /// stored as text, so a path that is not valid UTF-8 is rejected with
    /// [`DatabaseError::QueryFailed`] rather than stored lossily.
    pub async fn insert_history(&self, item: &HistoryItem) -> Result<i64> {
        let path = item.path.to_str().ok_or_else(|| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "path is not valid UTF-8: {}",
                item.path.display()
            )))
        })?;
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO history (
                reference_id, isrc, title, artists, album, cover_url,
                quality, format, backend, path, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.reference_id)
        .bind(&item.isrc)
        .bind(&item.title)
        .bind(&item.artists)
        .bind(&item.album)
        .bind(&item.cover_url)
        .bind(&item.quality)
        .bind(&item.format)
        .bind(&item.backend)
        .bind(path)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(result.last_insert_rowid())
    }

    /// Query history with pagination
    ///
    /// Returns entries most recent first.
    pub async fn query_history(&self, limit: usize, offset: usize) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM history ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(rows.into_iter().map(HistoryEntry::from).collect())
    }

    /// Count history entries
    ///
    /// Useful for pagination.
    pub async fn count_history(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM history")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(count)
    }

    /// Search history by title, artists or album (case-insensitive substring)
    ///
    /// Returns matches most recent first. `%` and `_` in the query match
    /// literally.
    pub async fn search_history(&self, query: &str) -> Result<Vec<HistoryEntry>> {
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");

        let rows = sqlx::query_as::<_, HistoryRow>(&format!(
            r#"
            SELECT {HISTORY_COLUMNS}
            FROM history
            WHERE title LIKE ? ESCAPE '\'
               OR artists LIKE ? ESCAPE '\'
               OR album LIKE ? ESCAPE '\'
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(rows.into_iter().map(HistoryEntry::from).collect())
    }

    /// Get a single history entry by ID
    pub async fn get_history_entry(&self, id: i64) -> Result<Option<HistoryEntry>> {
        let row = sqlx::query_as::<_, HistoryRow>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM history WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(row.map(HistoryEntry::from))
    }

    /// Clear all history
    ///
    /// Returns the number of records deleted.
    /// This is a destructive operation - use with caution.
    pub async fn clear_history(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM history")
            .execute(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(result.rows_affected())
    }

    /// Write the whole history to `path` as pretty-printed JSON
    ///
    /// Entries are written most recent first. Returns the number exported.
    pub async fn export_history(&self, path: &Path) -> Result<usize> {
        let rows = sqlx::query_as::<_, HistoryRow>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM history ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        let entries: Vec<HistoryEntry> = rows.into_iter().map(HistoryEntry::from).collect();
        let json = serde_json::to_string_pretty(&entries)?;
        tokio::fs::write(path, json).await?;

        tracing::info!(path = %path.display(), count = entries.len(), "history exported");
        Ok(entries.len())
    }
}
