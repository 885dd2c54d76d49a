//! Wallboard background daemon.
//!
//! Loads configuration, opens the portal store, and runs the schedule
//! evaluation and snapshot export loops until interrupted.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use wallboard::{
    ChangeNotifier, PageCache, PortalConfig, ScheduleEngine, SchedulerHandle, SnapshotExporter,
    SqliteStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = PortalConfig::load()?;
    tracing::info!(
        db_dir = %config.store.db_dir.display(),
        poll_interval_ms = config.engine.poll_interval_ms,
        export_interval_secs = config.export.interval_secs,
        "wallboardd starting"
    );

    let store = Arc::new(SqliteStore::new(&config.store.db_dir)?);
    let cache = Arc::new(PageCache::new());
    let notifier = ChangeNotifier::new();

    // Log outgoing change events. The portal web layer attaches its own
    // receiver and forwards the wire form over its push socket.
    let mut events = notifier.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::debug!(payload = %event.to_wire(), "change event"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "change event log fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let engine = Arc::new(ScheduleEngine::new(
        store.clone(),
        cache,
        notifier.clone(),
        config.engine.poll_interval_ms,
    ));
    let exporter = Arc::new(SnapshotExporter::new(
        store,
        config.export.output_path.clone(),
    ));

    let handle = SchedulerHandle::start(engine, exporter, &config);

    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupt received, shutting down");
    handle.stop().await;

    tracing::info!("wallboardd shut down cleanly");
    Ok(())
}
