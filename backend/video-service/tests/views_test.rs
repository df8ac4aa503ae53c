//! Integration Tests: view counting, reconciliation and shutdown flush

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::Harness;
use video_cache::CacheBackend;
use video_service::repository::VideoRepository;
use video_service::services::ReconcileReport;

#[tokio::test]
async fn test_reconcile_persists_counter_and_is_idempotent() {
    let h = Harness::new();
    h.seed_video(1, 5, 0, 60).await;
    let profile = h.repo.get_profile(1).await.unwrap();

    h.services.views.record_view(&profile).await.unwrap();
    assert_eq!(h.services.views.record_view(&profile).await.unwrap(), 7);
    h.settle().await;

    let first = h.services.views.reconcile().await.unwrap();
    assert_eq!(
        first,
        ReconcileReport {
            scanned: 1,
            updated: 1,
            skipped: 0
        }
    );
    assert_eq!(h.repo.stats(1).unwrap().views, 7);

    let second = h.services.views.reconcile().await.unwrap();
    assert_eq!(second.updated, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(h.repo.stats(1).unwrap().views, 7);
}

#[tokio::test]
async fn test_expired_counter_is_forgotten() {
    let h = Harness::new();
    h.seed_video(4, 0, 0, 60).await;
    h.backend.set("video:views:4", "5", None).await.unwrap();
    assert_eq!(h.services.views.reconcile().await.unwrap().updated, 1);

    // The counter expires and the stored value moves on without the cache.
    h.backend.del("video:views:4").await.unwrap();
    let report = h.services.views.reconcile().await.unwrap();
    assert_eq!(report.scanned, 0);
    h.repo.update_views(4, 2).await.unwrap();

    // Reseeded at the previously flushed value: still written, not skipped.
    h.backend.set("video:views:4", "5", None).await.unwrap();
    let report = h.services.views.reconcile().await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(h.repo.stats(4).unwrap().views, 5);
}

#[tokio::test]
async fn test_malformed_keys_do_not_abort_the_pass() {
    let h = Harness::new();
    h.seed_video(2, 0, 0, 60).await;
    h.backend.set("video:views:abc", "3", None).await.unwrap();
    h.backend.set("video:views:9", "lots", None).await.unwrap();
    h.cache.incr_views(2, 0).await.unwrap();

    let report = h.services.views.reconcile().await.unwrap();
    assert_eq!(report.scanned, 3);
    assert_eq!(report.updated, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(h.repo.stats(2).unwrap().views, 1);
}

#[tokio::test]
async fn test_store_failure_is_retried_next_pass() {
    let h = Harness::new();
    h.seed_video(3, 0, 0, 60).await;
    h.cache.incr_views(3, 0).await.unwrap();

    h.repo.set_failing(true);
    let report = h.services.views.reconcile().await.unwrap();
    assert_eq!(report.updated, 0);
    assert_eq!(report.skipped, 1);

    h.repo.set_failing(false);
    let report = h.services.views.reconcile().await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(h.repo.stats(3).unwrap().views, 1);
}

#[tokio::test]
async fn test_scan_failure_fails_the_pass() {
    let h = Harness::new();
    h.backend.set_unavailable(true);
    assert!(h.services.views.reconcile().await.is_err());
}

#[tokio::test]
async fn test_periodic_reconciliation() {
    let h = Harness::new();
    h.seed_video(4, 0, 0, 60).await;
    h.cache.incr_views(4, 0).await.unwrap();

    let handle = Arc::clone(&h.services.views).start(Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(h.repo.stats(4).unwrap().views, 1);

    handle.shutdown(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn test_shutdown_flushes_pending_views() {
    let h = Harness::new();
    h.seed_video(5, 100, 0, 60).await;

    let handle = Arc::clone(&h.services.views).start(Duration::from_secs(3600));
    for _ in 0..3 {
        h.services.videos.get(5).await.unwrap();
    }
    assert_eq!(h.repo.stats(5).unwrap().views, 100);

    let report = handle.shutdown(Duration::from_secs(2)).await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(h.repo.stats(5).unwrap().views, 103);
    assert_eq!(h.services.tasks.in_flight(), 0);
}
