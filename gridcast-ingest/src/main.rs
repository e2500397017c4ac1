use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use gridcast_ingest::{
    config::AppConfig,
    fetch::{RenDatahubFetcher, DATE_FORMAT},
    metrics_server, observability, resample, GridStore, SyncEngine,
};
use time::Date;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let base_date = Date::parse(&cfg.source.base_date, DATE_FORMAT)
        .with_context(|| format!("invalid source.base_date {:?}", cfg.source.base_date))?;

    let store = GridStore::open(Path::new(&cfg.database.path)).await?;
    let fetcher = RenDatahubFetcher::new(
        cfg.source.url.clone(),
        cfg.source.culture.clone(),
        Duration::from_secs(cfg.source.timeout_secs),
    )?;

    let engine = SyncEngine::new(store, fetcher, base_date);
    let written = engine.synchronize().await?;
    tracing::info!(records = written, "sync finished");

    let hours =
        resample::materialize_hourly(engine.store(), Path::new(&cfg.resample.output_path)).await?;
    tracing::info!(hours, path = %cfg.resample.output_path, "hourly view materialized");

    Ok(())
}
