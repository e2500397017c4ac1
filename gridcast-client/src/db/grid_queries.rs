use anyhow::{Context, Result};
use sqlx::SqlitePool;
use time::{Date, PrimitiveDateTime, Time};

use crate::domain::{column_list, GridRecord, TS_FORMAT};

/// Fetch the full store, ordered ascending by timestamp.
pub async fn scan_all(pool: &SqlitePool) -> Result<Vec<GridRecord>> {
    let sql = format!(
        "SELECT date_time, {} FROM grid_data ORDER BY date_time",
        column_list()
    );
    let rows = sqlx::query_as::<_, GridRecord>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

/// Fetch records for an inclusive calendar-date range, ordered ascending.
pub async fn range(pool: &SqlitePool, start: Date, end: Date) -> Result<Vec<GridRecord>> {
    let lower = PrimitiveDateTime::new(start, Time::MIDNIGHT).format(TS_FORMAT)?;
    let upper_date = end.next_day().context("date range end overflows")?;
    let upper = PrimitiveDateTime::new(upper_date, Time::MIDNIGHT).format(TS_FORMAT)?;

    let sql = format!(
        "SELECT date_time, {} FROM grid_data \
         WHERE date_time >= ? AND date_time < ? \
         ORDER BY date_time",
        column_list()
    );
    let rows = sqlx::query_as::<_, GridRecord>(&sql)
        .bind(lower)
        .bind(upper)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
