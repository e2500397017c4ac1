use std::path::Path;

use anyhow::{bail, Result};
use gridcast_ingest::{config::AppConfig, observability, sync::SAMPLING_INTERVAL, GridStore};

/// Store-health check: walk the full scan and report every sample timestamp
/// missing at the source's native interval. Gaps mean a prior sync was
/// partial; the next `synchronize()` run re-covers its window, but anything
/// older needs a manual backfill, so this exits non-zero to flag it.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let store = GridStore::open(Path::new(&cfg.database.path)).await?;
    store.ensure_schema().await?;

    let gaps = store.find_gaps(SAMPLING_INTERVAL).await?;
    for gap in &gaps {
        tracing::warn!(timestamp = %gap, "missing sample");
    }

    if !gaps.is_empty() {
        bail!("{} missing samples detected", gaps.len());
    }

    tracing::info!("no gaps detected");
    Ok(())
}
