mod helpers;

use bytes::Bytes;
use chrono::Duration as ChronoDuration;
use galleria_core::MediaKind;
use galleria_db::MemoryLedger;
use galleria_services::{
    GalleryService, IngestRequest, NoProgress, OrphanReconciler, ReconcileConfig,
};
use galleria_storage::{LocalStorage, Storage};
use helpers::{png_bytes, test_config, MemoryStorage};
use std::sync::Arc;
use std::time::Duration;

fn config(grace: Duration, dry_run: bool) -> ReconcileConfig {
    ReconcileConfig {
        grace_period: grace,
        interval: Duration::from_secs(3600),
        dry_run,
    }
}

#[tokio::test]
async fn sweep_deletes_only_old_unreferenced_objects() {
    let storage = Arc::new(MemoryStorage::new());
    let ledger = Arc::new(MemoryLedger::new());
    let service = GalleryService::new(storage.clone(), ledger.clone(), &test_config(false));

    let item = service
        .ingest(IngestRequest::image(png_bytes(8, 8)), &NoProgress)
        .await
        .unwrap();
    let kept_key = storage.keys()[0].clone();
    assert!(item.primary_object_ref.ends_with(&kept_key));

    storage.seed("gallery/images/img-1-oldorphn.jpg", ChronoDuration::days(3));
    storage.seed("gallery/images/img-2-neworphn.jpg", ChronoDuration::minutes(5));
    storage.seed("avatars/someone.png", ChronoDuration::days(30));

    let reconciler = OrphanReconciler::new(
        storage.clone(),
        ledger.clone(),
        config(Duration::from_secs(24 * 3600), false),
    );
    let report = reconciler.sweep().await.unwrap();

    assert_eq!(report.scanned, 3);
    assert_eq!(report.referenced, 1);
    assert_eq!(report.too_recent, 1);
    assert_eq!(report.orphans, vec!["gallery/images/img-1-oldorphn.jpg".to_string()]);
    assert!(report.failed.is_empty());

    assert_eq!(
        storage.keys(),
        vec![
            "avatars/someone.png".to_string(),
            "gallery/images/img-2-neworphn.jpg".to_string(),
            kept_key,
        ]
    );
}

#[tokio::test]
async fn retired_items_become_orphans() {
    let storage = Arc::new(MemoryStorage::new());
    let ledger = Arc::new(MemoryLedger::new());
    let service = GalleryService::new(storage.clone(), ledger.clone(), &test_config(false));

    let item = service
        .ingest(IngestRequest::image(png_bytes(8, 8)), &NoProgress)
        .await
        .unwrap();
    storage.fail_deletes(true);
    service.retire(item.id).await.unwrap();
    storage.fail_deletes(false);
    assert_eq!(storage.keys().len(), 1);

    let reconciler = OrphanReconciler::new(storage.clone(), ledger.clone(), config(Duration::ZERO, false));
    let report = reconciler.sweep().await.unwrap();

    assert_eq!(report.orphans.len(), 1);
    assert!(storage.keys().is_empty());
    assert_eq!(service.list_active(Some(MediaKind::Image)).await.unwrap().len(), 0);
}

#[tokio::test]
async fn dry_run_reports_without_deleting() {
    let storage = Arc::new(MemoryStorage::new());
    storage.seed("gallery/videos/vid-1-abandond.mp4", ChronoDuration::days(2));

    let reconciler = OrphanReconciler::new(
        storage.clone(),
        Arc::new(MemoryLedger::new()),
        config(Duration::from_secs(3600), true),
    );
    let report = reconciler.sweep().await.unwrap();

    assert_eq!(report.orphans.len(), 1);
    assert!(storage.delete_calls().is_empty());
    assert_eq!(storage.keys().len(), 1);
}

#[tokio::test]
async fn sweep_works_against_local_storage() {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path(), "gallery-media", "http://localhost:3000/media".to_string())
        .await
        .unwrap();
    storage.create_bucket().await.unwrap();
    let storage = Arc::new(storage);
    let ledger = Arc::new(MemoryLedger::new());
    let service = GalleryService::new(storage.clone(), ledger.clone(), &test_config(false));

    let item = service
        .ingest(IngestRequest::image(png_bytes(8, 8)), &NoProgress)
        .await
        .unwrap();
    assert!(item
        .primary_object_ref
        .starts_with("http://localhost:3000/media/gallery-media/gallery/images/img-"));

    storage
        .put(
            "gallery/images/img-9-leftover.jpg",
            Bytes::from_static(b"orphan"),
            "image/jpeg",
        )
        .await
        .unwrap();

    let reconciler = OrphanReconciler::new(storage.clone(), ledger.clone(), config(Duration::ZERO, false));
    let report = reconciler.sweep().await.unwrap();

    assert_eq!(report.scanned, 2);
    assert_eq!(report.orphans, vec!["gallery/images/img-9-leftover.jpg".to_string()]);
    let remaining = storage.list("gallery/").await.unwrap();
    assert_eq!(remaining.len(), 1);
}

#[tokio::test]
async fn background_loop_survives_a_zero_interval() {
    let reconciler = Arc::new(OrphanReconciler::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(MemoryLedger::new()),
        ReconcileConfig {
            grace_period: Duration::from_secs(3600),
            interval: Duration::ZERO,
            dry_run: true,
        },
    ));

    let handle = reconciler.start();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished());

    handle.abort();
    let err = handle.await.unwrap_err();
    assert!(err.is_cancelled());
}
