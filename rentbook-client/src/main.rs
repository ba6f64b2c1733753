//! rentbook entry point: open one renter's bill for a month and print it.

use std::sync::Arc;

use rentbook_client::{init_tracing, CliArgs, CliError, ClientConfig, HttpBillStore, TelemetryConfig};
use rentbook_core::BillTotals;
use rentbook_storage::{BillCache, Clock, SystemClock};
use rentbook_sync::{BillSession, ViewSnapshot};
use serde::Serialize;

#[derive(Serialize)]
struct Report<'a> {
    view: &'a ViewSnapshot,
    totals: Option<BillTotals>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    init_tracing(&TelemetryConfig::default())?;

    let config = ClientConfig::load()?;
    let args = CliArgs::parse(std::env::args().skip(1), SystemClock.today())?;

    let sync_config = config.sync_config();
    let store = Arc::new(HttpBillStore::new(&config)?);
    let cache = Arc::new(BillCache::from_config(&sync_config));
    let session = BillSession::new(store, cache, args.renter(), sync_config)?;

    match session.warm().await {
        Ok(count) => tracing::debug!(periods = count, "Cache warmed"),
        Err(e) => tracing::warn!(error = %e, "Cache warm-up failed, loading on demand"),
    }

    session.open(args.month, args.year)?;
    session.settle().await;

    let view = session.view();
    if let Some(notice) = &view.notice {
        tracing::error!(key = %notice.key, message = %notice.message, "Bill could not be loaded");
    }
    let report = Report {
        view: &view,
        totals: view.editing().map(|bill| bill.totals()),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
