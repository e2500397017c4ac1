use std::fs;
use std::path::Path;

use gridcast_client::domain::{column_list, GridRecord, FIELD_COUNT, FIELD_NAMES, TS_FORMAT};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use time::{Duration, PrimitiveDateTime};

use crate::error::SyncError;

/// Durable keyed store for grid records, primary key = timestamp.
///
/// The sync engine is the only writer; readers (resampler, dashboards) see
/// either the pre-sync or post-sync state because writes commit in one
/// transaction and WAL keeps readers on their snapshot.
#[derive(Clone)]
pub struct GridStore {
    pool: SqlitePool,
}

impl GridStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Self { pool })
    }

    /// Private in-memory store. A single connection, since every pooled
    /// connection would otherwise get its own empty database.
    pub async fn open_in_memory() -> Result<Self, SyncError> {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Read-side pool handle for `gridcast_client::db` queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Idempotent create-if-absent, safe on every startup.
    pub async fn ensure_schema(&self) -> Result<(), SyncError> {
        let columns: Vec<String> = FIELD_NAMES.iter().map(|c| format!("{c} REAL")).collect();
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS grid_data (date_time TEXT PRIMARY KEY, {})",
            columns.join(", ")
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// The sync cursor: newest stored timestamp, `None` on an empty store.
    /// A stored value that no longer parses is corruption, never skipped.
    pub async fn max_timestamp(&self) -> Result<Option<PrimitiveDateTime>, SyncError> {
        let row: (Option<String>,) = sqlx::query_as("SELECT MAX(date_time) FROM grid_data")
            .fetch_one(&self.pool)
            .await?;
        match row.0 {
            None => Ok(None),
            Some(text) => PrimitiveDateTime::parse(&text, TS_FORMAT)
                .map(Some)
                .map_err(|_| SyncError::CorruptCursor(text)),
        }
    }

    /// Insert-or-replace every record in one transaction. All-or-nothing:
    /// a mid-batch failure rolls the whole batch back.
    pub async fn upsert_many(&self, records: &[GridRecord]) -> Result<u64, SyncError> {
        if records.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; FIELD_COUNT + 1].join(", ");
        let sql = format!(
            "INSERT OR REPLACE INTO grid_data (date_time, {}) VALUES ({placeholders})",
            column_list()
        );

        let mut tx = self.pool.begin().await?;
        for rec in records {
            let mut query = sqlx::query(&sql).bind(rec.ts.format(TS_FORMAT)?);
            for value in rec.values() {
                query = query.bind(value);
            }
            query.execute(&mut *tx).await?;
        }
        tx.commit().await?;

        Ok(records.len() as u64)
    }

    /// Full scan, ascending by timestamp.
    pub async fn scan_all(&self) -> Result<Vec<GridRecord>, SyncError> {
        let sql = format!(
            "SELECT date_time, {} FROM grid_data ORDER BY date_time",
            column_list()
        );
        let rows = sqlx::query_as::<_, GridRecord>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Health check: sample timestamps expected at `interval` but absent
    /// between the first and last stored record. Gaps mean a prior sync was
    /// partial; they are reported, never repaired here.
    pub async fn find_gaps(&self, interval: Duration) -> Result<Vec<PrimitiveDateTime>, SyncError> {
        let records = self.scan_all().await?;
        let mut gaps = Vec::new();
        for pair in records.windows(2) {
            let mut expected = pair[0].ts + interval;
            while expected < pair[1].ts {
                gaps.push(expected);
                expected += interval;
            }
        }
        Ok(gaps)
    }
}
