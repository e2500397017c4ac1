use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime};

use crate::error::SyncError;
use crate::fetch::Fetch;
use crate::normalize::normalize_batch;
use crate::store::GridStore;

/// Native sampling interval of the remote source, also the overlap margin
/// re-fetched behind the cursor to absorb late corrections at the boundary.
pub const SAMPLING_INTERVAL: Duration = Duration::minutes(15);

/// The source finalizes a day with a one-day lag; same-day data is
/// provisional and never fetched.
const PUBLICATION_LAG: Duration = Duration::days(1);

/// Owns the store's write path: one fetch, one normalization pass, one
/// transactional upsert per invocation. Re-running is always safe because
/// every row in the window fully replaces its stored counterpart.
pub struct SyncEngine<F> {
    store: GridStore,
    fetcher: F,
    base_date: Date,
}

impl<F: Fetch> SyncEngine<F> {
    pub fn new(store: GridStore, fetcher: F, base_date: Date) -> Self {
        Self {
            store,
            fetcher,
            base_date,
        }
    }

    pub fn store(&self) -> &GridStore {
        &self.store
    }

    /// Run one synchronization attempt. Returns the number of records
    /// written; zero means the store was already up to date.
    pub async fn synchronize(&self) -> Result<u64, SyncError> {
        self.store.ensure_schema().await?;

        let cursor = self.store.max_timestamp().await?;
        let today = OffsetDateTime::now_utc().date();
        let Some((start, end)) = fetch_window(cursor, self.base_date, today) else {
            tracing::info!("store is up to date, nothing to fetch");
            return Ok(0);
        };

        tracing::info!(start = %start, end = %end, "fetching remote window");
        let batch = self.fetcher.fetch(start, end).await?;
        if batch.rows.is_empty() {
            tracing::info!("remote returned no rows for the window");
            return Ok(0);
        }

        let records = normalize_batch(&batch)?;
        let written = self.store.upsert_many(&records).await?;

        metrics::counter!("gridcast_synced_records_total").increment(written);
        tracing::info!(records = written, "synchronization committed");
        Ok(written)
    }
}

/// Compute the inclusive calendar-date window to request.
///
/// Empty store: backfill from the configured base date. Otherwise start one
/// sampling interval behind the cursor, truncated to its calendar date (the
/// remote API is date-granular, so the margin guarantees the cursor's own
/// day is re-fetched even when the cursor sits on midnight). End is always
/// yesterday. `None` means there is nothing finalized left to request.
pub fn fetch_window(
    cursor: Option<PrimitiveDateTime>,
    base_date: Date,
    today: Date,
) -> Option<(Date, Date)> {
    let end = today - PUBLICATION_LAG;
    let start = match cursor {
        Some(ts) => (ts - SAMPLING_INTERVAL).date(),
        None => base_date,
    };
    (start <= end).then_some((start, end))
}
