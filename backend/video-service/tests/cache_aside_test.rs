//! Integration Tests: cache-aside profile reads
//!
//! Coverage:
//! - cold read populates the cache, warm read never reaches the store
//! - cache outage degrades to store reads
//! - corrupt entries are repaired from the store
//! - unknown videos are NotFound and leave nothing cached
//! - a detail read counts a view and refreshes the hot rank

mod common;

use std::sync::Arc;

use common::Harness;
use video_cache::{CacheBackend, CacheKey};
use video_service::repository::VideoRepository;
use video_service::services::ProfileReader;

fn reader(h: &Harness) -> ProfileReader {
    let repo: Arc<dyn VideoRepository> = Arc::new(h.repo.clone());
    ProfileReader::new(h.cache.clone(), repo)
}

#[tokio::test]
async fn test_warm_read_does_not_hit_store() {
    let h = Harness::new();
    h.seed_video(1, 5, 2, 60).await;
    let profiles = reader(&h);

    let cold = profiles.get(1).await.unwrap();
    let warm = profiles.get(1).await.unwrap();

    assert_eq!(cold, warm);
    assert_eq!(cold.views, 5);
    assert_eq!(cold.likes, 2);
    assert_eq!(h.repo.profile_reads(), 1);
    assert!(h.backend.ttl(&CacheKey::profile(1)).is_some());
}

#[tokio::test]
async fn test_cache_outage_falls_back_to_store() {
    let h = Harness::new();
    h.seed_video(2, 0, 0, 60).await;
    h.backend.set_unavailable(true);
    let profiles = reader(&h);

    assert_eq!(profiles.get(2).await.unwrap().video_id, 2);
    assert_eq!(profiles.get(2).await.unwrap().video_id, 2);
    assert_eq!(h.repo.profile_reads(), 2);
}

#[tokio::test]
async fn test_corrupt_entry_is_rebuilt() {
    let h = Harness::new();
    h.seed_video(3, 9, 0, 60).await;
    h.backend
        .set(&CacheKey::profile(3), "{\"video_id\":", Some(600))
        .await
        .unwrap();
    let profiles = reader(&h);

    assert_eq!(profiles.get(3).await.unwrap().views, 9);
    assert_eq!(h.repo.profile_reads(), 1);

    profiles.get(3).await.unwrap();
    assert_eq!(h.repo.profile_reads(), 1);
}

#[tokio::test]
async fn test_unknown_video_is_not_found_and_not_cached() {
    let h = Harness::new();
    let profiles = reader(&h);

    let err = profiles.get(404).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(h.backend.is_empty());
}

#[tokio::test]
async fn test_detail_read_counts_view_and_refreshes_rank() {
    let h = Harness::new();
    h.seed_video(4, 10, 1, 3600).await;

    let profile = h.services.videos.get(4).await.unwrap();
    assert_eq!(profile.views, 11);

    let profile = h.services.videos.get(4).await.unwrap();
    assert_eq!(profile.views, 12);

    h.settle().await;
    let ranked = h.cache.rank_range(0, 0).await.unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].0, 4);

    let stats = h.repo.stats(4).unwrap();
    assert_eq!(stats.hot_score, ranked[0].1);
    // Views become durable only through reconciliation.
    assert_eq!(stats.views, 10);
}
