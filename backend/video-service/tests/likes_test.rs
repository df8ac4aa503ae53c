//! Integration Tests: like / unlike propagation

mod common;

use common::Harness;
use video_cache::{CacheBackend, CacheKey};
use video_core::LikeTransition;
use video_service::tasks::TaskOutcome;
use video_service::AppError;

#[tokio::test]
async fn test_like_twice_counts_once() {
    let h = Harness::new();
    h.seed_video(1, 0, 0, 60).await;

    let first = h.services.likes.like(7, 1).await.unwrap();
    assert_eq!(first.transition, LikeTransition::Liked);
    assert_eq!(first.propagated.await.unwrap(), TaskOutcome::Completed);

    let second = h.services.likes.like(7, 1).await.unwrap();
    assert_eq!(second.transition, LikeTransition::Unchanged);
    assert_eq!(second.propagated.await.unwrap(), TaskOutcome::Completed);

    assert_eq!(h.repo.stats(1).unwrap().likes, 1);
    assert_eq!(h.cache.likes(1).await.unwrap(), Some(1));
}

#[tokio::test]
async fn test_like_unlike_like_nets_one() {
    let h = Harness::new();
    h.seed_video(2, 0, 0, 60).await;

    let mut transitions = Vec::new();
    for liked in [true, false, true] {
        let update = if liked {
            h.services.likes.like(7, 2).await.unwrap()
        } else {
            h.services.likes.unlike(7, 2).await.unwrap()
        };
        transitions.push(update.transition);
        update.propagated.await.unwrap();
    }

    assert_eq!(
        transitions,
        vec![
            LikeTransition::Liked,
            LikeTransition::Unliked,
            LikeTransition::Liked
        ]
    );
    assert_eq!(h.repo.stats(2).unwrap().likes, 1);
    assert_eq!(h.cache.likes(2).await.unwrap(), Some(1));
    assert_eq!(h.cache.like_flag(7, 2).await.unwrap(), Some(true));
}

#[tokio::test]
async fn test_counter_is_seeded_from_durable_likes() {
    let h = Harness::new();
    h.seed_video(3, 0, 41, 60).await;

    let update = h.services.likes.like(8, 3).await.unwrap();
    update.propagated.await.unwrap();

    assert_eq!(h.cache.likes(3).await.unwrap(), Some(42));
    assert_eq!(h.repo.stats(3).unwrap().likes, 42);
}

#[tokio::test]
async fn test_unlike_without_like_is_noop() {
    let h = Harness::new();
    h.seed_video(4, 0, 5, 60).await;

    let update = h.services.likes.unlike(7, 4).await.unwrap();
    assert_eq!(update.transition, LikeTransition::Unchanged);
    update.propagated.await.unwrap();

    assert_eq!(h.repo.stats(4).unwrap().likes, 5);
    assert!(!h.services.likes.is_liked(7, 4).await.unwrap());
}

#[tokio::test]
async fn test_like_unknown_video_is_not_found() {
    let h = Harness::new();

    let err = h.services.likes.like(7, 999).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!h.services.likes.is_liked(7, 999).await.unwrap());
}

#[tokio::test]
async fn test_durable_failure_leaves_state_unchanged() {
    let h = Harness::new();
    h.seed_video(5, 0, 0, 60).await;
    // Warm the profile so only the like write fails.
    h.services.videos.get(5).await.unwrap();
    h.settle().await;

    h.repo.set_failing(true);
    let err = h.services.likes.like(7, 5).await.unwrap_err();
    assert!(matches!(err, AppError::DatabaseError(_)));
    h.repo.set_failing(false);

    h.settle().await;
    assert_eq!(h.cache.like_flag(7, 5).await.unwrap(), None);
    assert!(!h.services.likes.is_liked(7, 5).await.unwrap());
    assert_eq!(h.repo.stats(5).unwrap().likes, 0);
}

#[tokio::test]
async fn test_cache_failure_does_not_fail_like() {
    let h = Harness::new();
    h.seed_video(6, 0, 0, 60).await;
    h.backend.set_unavailable(true);

    let update = h.services.likes.like(7, 6).await.unwrap();
    assert_eq!(update.transition, LikeTransition::Liked);
    assert!(matches!(
        update.propagated.await.unwrap(),
        TaskOutcome::Failed(_)
    ));
    assert_eq!(h.repo.stats(6).unwrap().likes, 1);
}

#[tokio::test]
async fn test_is_liked_rebuilds_flag_from_store() {
    let h = Harness::new();
    h.seed_video(7, 0, 0, 60).await;
    h.services.likes.like(9, 7).await.unwrap().propagated.await.unwrap();

    // Drop the flag, then read it back through the store.
    h.backend.del(&CacheKey::like_flag(9, 7)).await.unwrap();

    assert!(h.services.likes.is_liked(9, 7).await.unwrap());
    assert_eq!(h.cache.like_flag(9, 7).await.unwrap(), Some(true));
}

#[tokio::test]
async fn test_like_refreshes_hot_rank() {
    let h = Harness::new();
    h.seed_video(8, 0, 0, 60).await;

    h.services.likes.like(7, 8).await.unwrap().propagated.await.unwrap();

    let ranked = h.cache.rank_range(0, -1).await.unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].0, 8);
    assert_eq!(h.repo.stats(8).unwrap().hot_score, ranked[0].1);
}
