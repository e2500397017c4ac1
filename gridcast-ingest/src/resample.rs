use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use gridcast_client::domain::{FIELD_COUNT, FIELD_NAMES, TS_FORMAT};
use time::{PrimitiveDateTime, Time};

use crate::error::SyncError;
use crate::store::GridStore;

/// Recompute the hourly-mean view from the full store and replace the
/// artifact at `out_path`. Returns the number of hour buckets written.
///
/// Always a full recompute: incremental mean maintenance drifts across
/// re-fetched overlap windows, a recompute cannot. The artifact is written
/// to a temp file and renamed into place, so readers only ever see a
/// complete view.
pub async fn materialize_hourly(store: &GridStore, out_path: &Path) -> Result<u64, SyncError> {
    let records = store.scan_all().await?;

    // (sum, count) per field per bucket; nulls contribute to neither.
    let mut buckets: BTreeMap<PrimitiveDateTime, [(f64, u32); FIELD_COUNT]> = BTreeMap::new();
    for rec in &records {
        let sums = buckets
            .entry(hour_bucket(rec.ts))
            .or_insert([(0.0, 0); FIELD_COUNT]);
        for (acc, value) in sums.iter_mut().zip(rec.values()) {
            if let Some(v) = value {
                acc.0 += v;
                acc.1 += 1;
            }
        }
    }

    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    // Build the replacement beside the final path, then rename into place.
    // A failed build or rename must not leave the partial file behind.
    let tmp_path = out_path.with_extension("tmp");
    let replaced = write_view(&tmp_path, &buckets)
        .and_then(|()| fs::rename(&tmp_path, out_path).map_err(SyncError::from));
    if let Err(e) = replaced {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    tracing::info!(hours = buckets.len(), path = %out_path.display(), "hourly view replaced");
    Ok(buckets.len() as u64)
}

fn write_view(
    path: &Path,
    buckets: &BTreeMap<PrimitiveDateTime, [(f64, u32); FIELD_COUNT]>,
) -> Result<(), SyncError> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = Vec::with_capacity(FIELD_COUNT + 1);
    header.push("date_time");
    header.extend(FIELD_NAMES);
    wtr.write_record(&header)?;

    for (bucket, sums) in buckets {
        let mut row = Vec::with_capacity(FIELD_COUNT + 1);
        row.push(bucket.format(TS_FORMAT)?);
        for (sum, count) in sums {
            row.push(if *count == 0 {
                String::new()
            } else {
                (sum / f64::from(*count)).to_string()
            });
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn hour_bucket(ts: PrimitiveDateTime) -> PrimitiveDateTime {
    let top = Time::from_hms(ts.hour(), 0, 0).unwrap_or(Time::MIDNIGHT);
    PrimitiveDateTime::new(ts.date(), top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcast_client::domain::GridRecord;
    use time::macros::datetime;

    fn rec(ts: PrimitiveDateTime, hydro: Option<f64>) -> GridRecord {
        let mut values = [None; FIELD_COUNT];
        values[0] = hydro;
        GridRecord::from_values(ts, values)
    }

    async fn store_with(records: &[GridRecord]) -> GridStore {
        let s = GridStore::open_in_memory().await.unwrap();
        s.ensure_schema().await.unwrap();
        s.upsert_many(records).await.unwrap();
        s
    }

    fn read_rows(path: &Path) -> Vec<csv::StringRecord> {
        let mut rdr = csv::Reader::from_path(path).unwrap();
        rdr.records().map(|r| r.unwrap()).collect()
    }

    #[tokio::test]
    async fn hourly_mean_excludes_nulls() {
        let s = store_with(&[
            rec(datetime!(2024-03-01 09:00:00), Some(10.0)),
            rec(datetime!(2024-03-01 09:15:00), Some(20.0)),
            rec(datetime!(2024-03-01 09:30:00), None),
            rec(datetime!(2024-03-01 09:45:00), Some(30.0)),
        ])
        .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("hourly.csv");
        let buckets = materialize_hourly(&s, &out).await.unwrap();
        assert_eq!(buckets, 1);

        let rows = read_rows(&out);
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "2024-03-01 09:00:00");
        // (10 + 20 + 30) / 3, the null sample contributes to neither side.
        assert_eq!(&rows[0][1], "20");
    }

    #[tokio::test]
    async fn empty_store_yields_header_only_view() {
        let s = store_with(&[]).await;
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("hourly.csv");

        assert_eq!(materialize_hourly(&s, &out).await.unwrap(), 0);

        let mut rdr = csv::Reader::from_path(&out).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(&headers[0], "date_time");
        assert_eq!(&headers[1], "hydro");
        assert_eq!(rdr.records().count(), 0);
    }

    #[tokio::test]
    async fn all_null_bucket_writes_empty_cell() {
        let s = store_with(&[rec(datetime!(2024-03-01 09:00:00), None)]).await;
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("hourly.csv");

        materialize_hourly(&s, &out).await.unwrap();
        let rows = read_rows(&out);
        assert_eq!(&rows[0][1], "");
    }

    #[tokio::test]
    async fn view_is_fully_replaced_on_each_run() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("hourly.csv");
        fs::write(&out, "stale artifact contents").unwrap();

        let s = store_with(&[rec(datetime!(2024-03-01 10:00:00), Some(5.0))]).await;
        materialize_hourly(&s, &out).await.unwrap();

        let contents = fs::read_to_string(&out).unwrap();
        assert!(!contents.contains("stale"));
        assert!(contents.contains("2024-03-01 10:00:00"));
    }

    #[tokio::test]
    async fn failed_replace_removes_the_partial_artifact() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory at the view path makes the final rename fail.
        let out = dir.path().join("hourly.csv");
        fs::create_dir_all(out.join("occupied")).unwrap();

        let s = store_with(&[rec(datetime!(2024-03-01 10:00:00), Some(5.0))]).await;
        assert!(materialize_hourly(&s, &out).await.is_err());
        assert!(!out.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn buckets_are_hour_aligned_and_ordered() {
        let s = store_with(&[
            rec(datetime!(2024-03-01 10:45:00), Some(4.0)),
            rec(datetime!(2024-03-01 09:15:00), Some(2.0)),
            rec(datetime!(2024-03-01 10:15:00), Some(2.0)),
        ])
        .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("hourly.csv");
        assert_eq!(materialize_hourly(&s, &out).await.unwrap(), 2);

        let rows = read_rows(&out);
        assert_eq!(&rows[0][0], "2024-03-01 09:00:00");
        assert_eq!(&rows[1][0], "2024-03-01 10:00:00");
        assert_eq!(&rows[1][1], "3");
    }
}
