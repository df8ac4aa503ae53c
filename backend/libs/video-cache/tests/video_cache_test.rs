//! VideoCache behaviour against the in-memory backend.

use std::sync::Arc;

use chrono::Utc;
use video_cache::{CacheBackend, CacheError, CacheKey, InMemoryCache, VideoCache};
use video_core::{VideoProfile, VideoStatus};

fn setup() -> (InMemoryCache, VideoCache) {
    let backend = InMemoryCache::new();
    let cache = VideoCache::new(Arc::new(backend.clone()));
    (backend, cache)
}

fn profile(id: i64, title: &str) -> VideoProfile {
    VideoProfile {
        video_id: id,
        user_id: 9,
        title: title.to_string(),
        description: String::new(),
        cover_url: String::new(),
        video_url: format!("https://cdn.example.com/{id}.mp4"),
        duration_seconds: 30,
        status: VideoStatus::Published,
        views: 3,
        likes: 1,
        comments: 0,
        hot_score: 0.5,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn profile_round_trip_with_ttl() {
    let (backend, cache) = setup();
    let p = profile(101, "first");

    cache.set_profile(&p).await.unwrap();

    assert_eq!(cache.get_profile(101).await.unwrap(), Some(p));
    let ttl = backend.ttl("video:101").expect("profile has a ttl");
    assert!(ttl.as_secs() > 29 * 60 && ttl.as_secs() <= 30 * 60);
}

#[tokio::test]
async fn refusal_rule_keeps_existing_entries() {
    let (backend, cache) = setup();
    let existing = profile(0, "not yet");
    // Seed an unrelated valid entry and a raw value under video:0.
    cache.set_profile(&profile(5, "kept")).await.unwrap();
    backend.set("video:0", "sentinel", None).await.unwrap();

    let err = cache.set_profile(&existing).await.unwrap_err();
    assert!(matches!(err, CacheError::Refused(_)));

    assert_eq!(
        backend.get("video:0").await.unwrap().as_deref(),
        Some("sentinel")
    );
    assert_eq!(cache.get_profile(5).await.unwrap().unwrap().title, "kept");
}

#[tokio::test]
async fn corrupt_or_empty_entries_are_misses() {
    let (backend, cache) = setup();

    backend.set("video:7", "{not json", None).await.unwrap();
    assert_eq!(cache.get_profile(7).await.unwrap(), None);
    assert!(!backend.exists("video:7").await.unwrap());

    backend.set("video:8", "{}", None).await.unwrap();
    assert_eq!(cache.get_profile(8).await.unwrap(), None);
    assert!(!backend.exists("video:8").await.unwrap());
}

#[tokio::test]
async fn view_counter_seeds_once() {
    let (_, cache) = setup();

    assert_eq!(cache.views(3).await.unwrap(), None);
    assert_eq!(cache.incr_views(3, 40).await.unwrap(), 41);
    // Seed is ignored once the counter exists.
    assert_eq!(cache.incr_views(3, 999).await.unwrap(), 42);
    assert_eq!(cache.views(3).await.unwrap(), Some(42));
}

#[tokio::test]
async fn like_counter_never_negative() {
    let (_, cache) = setup();

    assert_eq!(cache.adjust_likes(4, -1, 0).await.unwrap(), 0);
    assert_eq!(cache.adjust_likes(4, 1, 0).await.unwrap(), 1);
    assert_eq!(cache.adjust_likes(4, -1, 0).await.unwrap(), 0);
    assert_eq!(cache.likes(4).await.unwrap(), Some(0));
}

#[tokio::test]
async fn like_flag_round_trip() {
    let (backend, cache) = setup();

    assert_eq!(cache.like_flag(1, 2).await.unwrap(), None);
    cache.set_like_flag(1, 2, true).await.unwrap();
    assert_eq!(cache.like_flag(1, 2).await.unwrap(), Some(true));
    cache.set_like_flag(1, 2, false).await.unwrap();
    assert_eq!(cache.like_flag(1, 2).await.unwrap(), Some(false));
    assert!(backend.ttl(&CacheKey::like_flag(1, 2)).is_some());
}

#[tokio::test]
async fn rank_range_is_descending_and_paged() {
    let (backend, cache) = setup();
    for id in 1..=25i64 {
        cache.upsert_rank(id, id as f64 / 10.0).await.unwrap();
    }
    // Last write wins.
    cache.upsert_rank(1, 100.0).await.unwrap();
    backend
        .zadd(CacheKey::HOT_RANK, "garbage", 50.0)
        .await
        .unwrap();

    let top = cache.rank_range(0, 2).await.unwrap();
    // "garbage" occupies rank 1 and is dropped from the decoded slice.
    assert_eq!(top, vec![(1, 100.0), (25, 2.5)]);

    let next = cache.rank_range(3, 5).await.unwrap();
    assert_eq!(
        next.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
        vec![24, 23, 22]
    );
}

#[tokio::test]
async fn empty_pages_are_not_cached() {
    let (backend, cache) = setup();
    let key = CacheKey::search("cats", 1, 10);

    assert!(!cache.set_page(&key, &[]).await.unwrap());
    assert!(!backend.exists(&key).await.unwrap());

    assert!(cache.set_page(&key, &[profile(1, "cats")]).await.unwrap());
    let page = cache.get_page(&key).await.unwrap().unwrap();
    assert_eq!(page.len(), 1);
    let ttl = backend.ttl(&key).unwrap();
    assert!(ttl.as_secs() <= 5 * 60);
}

#[tokio::test]
async fn scan_finds_only_view_counters() {
    let (_, cache) = setup();
    cache.incr_views(1, 0).await.unwrap();
    cache.incr_views(2, 0).await.unwrap();
    cache.adjust_likes(1, 1, 0).await.unwrap();
    cache.set_profile(&profile(1, "x")).await.unwrap();

    let keys = cache.scan_view_counters().await.unwrap();
    assert_eq!(keys, vec!["video:views:1", "video:views:2"]);
}

#[tokio::test]
async fn unavailable_backend_surfaces_errors() {
    let (backend, cache) = setup();
    backend.set_unavailable(true);
    assert!(matches!(
        cache.get_profile(1).await,
        Err(CacheError::Redis(_))
    ));
    assert!(cache.ping().await.is_err());
}
