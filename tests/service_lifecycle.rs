#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use chrono::Utc;
use wallboard::store::types::entries_to_blob;
use wallboard::store::{Card, ScheduleEntry, SqliteStore};
use wallboard::{
    ChangeEvent, ChangeNotifier, PageCache, PortalConfig, ScheduleEngine, SchedulerHandle,
    SnapshotExporter,
};

fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}

fn temp_root(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "wallboard-svc-{name}-{}-{}",
        std::process::id(),
        now_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("create temp test dir");
    dir
}

/// Wire the service the way the daemon does and let it run briefly: the
/// active window must be applied, exactly one change event must go out,
/// and a snapshot must land on disk.
#[tokio::test]
async fn service_applies_schedules_and_exports_snapshots() {
    let root = temp_root("full-run");
    let store = Arc::new(SqliteStore::new(&root).expect("open store"));

    let now = Utc::now();
    store
        .insert_card(&Card {
            id: 1,
            title: "Lobby screen".to_owned(),
            subtitle: String::new(),
            image: Some("A.png".to_owned()),
            schedule_entries: entries_to_blob(&[ScheduleEntry {
                start_date: now - chrono::Duration::seconds(5),
                end_date: Some(now + chrono::Duration::seconds(3600)),
                image: "B.png".to_owned(),
            }]),
        })
        .expect("insert card");

    let mut config = PortalConfig::default();
    config.store.db_dir = root.clone();
    config.engine.poll_interval_ms = 20;
    config.export.interval_secs = 1;
    config.export.output_path = root.join("reports").join("snapshot.txt");

    let cache = Arc::new(PageCache::new());
    cache.put("/cards", "stale".to_owned());

    let notifier = ChangeNotifier::new();
    let mut rx = notifier.subscribe();

    let engine = Arc::new(ScheduleEngine::new(
        store.clone(),
        cache.clone(),
        notifier.clone(),
        config.engine.poll_interval_ms,
    ));
    let exporter = Arc::new(SnapshotExporter::new(
        store.clone(),
        config.export.output_path.clone(),
    ));

    let handle = SchedulerHandle::start(engine, exporter, &config);
    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.stop().await;

    let card = store.card(1).expect("read").expect("card");
    assert_eq!(card.image.as_deref(), Some("B.png"));
    assert!(cache.get("/cards").is_none(), "stale page must be dropped");

    // Many cycles ran, but the transition fires only once.
    let event = rx.recv().await.expect("apply event");
    assert_eq!(
        event,
        ChangeEvent::ImageApplied {
            card_id: 1,
            image: "B.png".to_owned()
        }
    );
    assert!(rx.try_recv().is_err(), "idempotent cycles emit nothing");

    let snapshot =
        std::fs::read_to_string(&config.export.output_path).expect("snapshot written");
    assert!(snapshot.contains("[cards]"));
    assert!(snapshot.contains("Lobby screen"));

    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn shutdown_is_prompt() {
    let root = temp_root("shutdown");
    let store = Arc::new(SqliteStore::new(&root).expect("open store"));

    let mut config = PortalConfig::default();
    config.store.db_dir = root.clone();
    config.engine.poll_interval_ms = 10;
    config.export.output_path = root.join("snapshot.txt");

    let engine = Arc::new(ScheduleEngine::new(
        store.clone(),
        Arc::new(PageCache::new()),
        ChangeNotifier::new(),
        config.engine.poll_interval_ms,
    ));
    let exporter = Arc::new(SnapshotExporter::new(
        store,
        config.export.output_path.clone(),
    ));

    let handle = SchedulerHandle::start(engine, exporter, &config);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let begun = Instant::now();
    handle.stop().await;
    assert!(
        begun.elapsed() < Duration::from_secs(5),
        "stop must not hang on idle loops"
    );

    let _ = std::fs::remove_dir_all(root);
}
