//! Background loop orchestration.
//!
//! [`SchedulerHandle`] owns the two repeating timers of the service: the
//! schedule evaluation loop and the snapshot export loop. Both are spawned
//! by [`SchedulerHandle::start`] and run until [`SchedulerHandle::stop`]
//! cancels them. A failing cycle is logged and the timer keeps going;
//! cancellation is only observed between cycles, so an in-flight cycle
//! always runs to completion.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::PortalConfig;
use crate::engine::ScheduleEngine;
use crate::export::SnapshotExporter;

/// Handle to the running background loops.
pub struct SchedulerHandle {
    cancel: CancellationToken,
    evaluate_handle: JoinHandle<()>,
    export_handle: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Spawn both loops. The first tick of each fires immediately.
    ///
    /// The evaluation tick rate comes from the engine itself so the loop
    /// and the engine's apply-window boundary cannot disagree.
    pub fn start(
        engine: Arc<ScheduleEngine>,
        exporter: Arc<SnapshotExporter>,
        config: &PortalConfig,
    ) -> Self {
        let cancel = CancellationToken::new();

        let eval_cancel = cancel.clone();
        let poll_interval = Duration::from_millis(engine.poll_interval_ms());
        let evaluate_handle = tokio::spawn(async move {
            info!(
                interval_ms = poll_interval.as_millis() as u64,
                "evaluation loop started"
            );
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                tokio::select! {
                    () = eval_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = engine.evaluate_all(Utc::now()).await {
                            warn!(error = %e, "evaluation cycle failed");
                        }
                    }
                }
            }
            info!("evaluation loop stopped");
        });

        let export_cancel = cancel.clone();
        let export_interval = config.export.interval();
        let export_handle = tokio::spawn(async move {
            info!(
                interval_secs = export_interval.as_secs(),
                "export loop started"
            );
            let mut ticker = tokio::time::interval(export_interval);
            loop {
                tokio::select! {
                    () = export_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = exporter.export_once(Utc::now()).await {
                            warn!(error = %e, "snapshot export failed");
                        }
                    }
                }
            }
            info!("export loop stopped");
        });

        Self {
            cancel,
            evaluate_handle,
            export_handle,
        }
    }

    /// Cancel both loops and wait for them to finish.
    ///
    /// No further cycles start after this returns.
    pub async fn stop(self) {
        info!("stopping background loops");
        self.cancel.cancel();
        let _ = self.evaluate_handle.await;
        let _ = self.export_handle.await;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::cache::PageCache;
    use crate::error::{PortalError, Result};
    use crate::notify::ChangeNotifier;
    use crate::store::PortalStore;
    use crate::store::types::{Card, CardPatch, Category, Contact, Task};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Store that counts card reads and can be told to fail them.
    #[derive(Default)]
    struct CountingStore {
        reads: AtomicUsize,
        fail_reads: AtomicBool,
    }

    #[async_trait]
    impl PortalStore for CountingStore {
        async fn cards(&self) -> Result<Vec<Card>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(PortalError::Store("injected read failure".into()));
            }
            Ok(Vec::new())
        }

        async fn update_card(&self, _id: i64, _patch: CardPatch) -> Result<Option<Card>> {
            Ok(None)
        }

        async fn tasks(&self) -> Result<Vec<Task>> {
            Ok(Vec::new())
        }

        async fn categories(&self) -> Result<Vec<Category>> {
            Ok(Vec::new())
        }

        async fn contacts(&self) -> Result<Vec<Contact>> {
            Ok(Vec::new())
        }
    }

    fn engine_with(store: Arc<CountingStore>, interval_ms: u64) -> Arc<ScheduleEngine> {
        Arc::new(ScheduleEngine::new(
            store,
            Arc::new(PageCache::new()),
            ChangeNotifier::new(),
            interval_ms,
        ))
    }

    fn exporter_to(store: Arc<CountingStore>, path: std::path::PathBuf) -> Arc<SnapshotExporter> {
        Arc::new(SnapshotExporter::new(store, path))
    }

    #[tokio::test]
    async fn first_evaluation_cycle_runs_immediately() {
        let store = Arc::new(CountingStore::default());
        let dir = tempfile::TempDir::new().expect("tempdir");
        // Long interval: only the immediate first tick can fire.
        let engine = engine_with(store.clone(), 60_000);
        let exporter = exporter_to(store.clone(), dir.path().join("snap.txt"));

        let handle = SchedulerHandle::start(engine, exporter, &PortalConfig::default());
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.stop().await;

        assert!(store.reads.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn no_cycles_start_after_stop() {
        let store = Arc::new(CountingStore::default());
        let dir = tempfile::TempDir::new().expect("tempdir");
        let engine = engine_with(store.clone(), 10);
        let exporter = exporter_to(store.clone(), dir.path().join("snap.txt"));

        let handle = SchedulerHandle::start(engine, exporter, &PortalConfig::default());
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop().await;

        let after_stop = store.reads.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.reads.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn failing_cycles_do_not_kill_the_timer() {
        let store = Arc::new(CountingStore::default());
        store.fail_reads.store(true, Ordering::SeqCst);
        let dir = tempfile::TempDir::new().expect("tempdir");
        let engine = engine_with(store.clone(), 10);
        let exporter = exporter_to(store.clone(), dir.path().join("snap.txt"));

        let handle = SchedulerHandle::start(engine, exporter, &PortalConfig::default());
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.stop().await;

        assert!(store.reads.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn export_loop_writes_snapshot_on_startup() {
        let store = Arc::new(CountingStore::default());
        let dir = tempfile::TempDir::new().expect("tempdir");
        let out = dir.path().join("snap.txt");
        let engine = engine_with(store.clone(), 60_000);
        let exporter = exporter_to(store.clone(), out.clone());

        let handle = SchedulerHandle::start(engine, exporter, &PortalConfig::default());
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.stop().await;

        assert!(out.exists());
    }

    #[tokio::test]
    async fn export_failure_leaves_evaluation_loop_running() {
        let store = Arc::new(CountingStore::default());
        let dir = tempfile::TempDir::new().expect("tempdir");
        // The output path is a directory, so every export fails.
        let engine = engine_with(store.clone(), 10);
        let exporter = exporter_to(store.clone(), dir.path().to_path_buf());

        let handle = SchedulerHandle::start(engine, exporter, &PortalConfig::default());
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.stop().await;

        assert!(store.reads.load(Ordering::SeqCst) >= 3);
    }
}
