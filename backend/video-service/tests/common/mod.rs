//! Shared wiring for video-service integration tests: real services over
//! the in-memory cache, repository, blob store and publisher.

#![allow(dead_code)]

pub mod mock_blob_store;
pub mod mock_publisher;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use snowflake_id::Snowflake;
use video_cache::{InMemoryCache, VideoCache};
use video_core::{HotScorer, VideoMeta, VideoStats, VideoStatus};
use video_service::repository::{InMemoryVideoRepository, VideoRepository};
use video_service::services::{ServiceDeps, Services};

pub use mock_blob_store::MockBlobStore;
pub use mock_publisher::MockTaskPublisher;

pub struct Harness {
    pub services: Services,
    pub repo: InMemoryVideoRepository,
    pub backend: InMemoryCache,
    pub cache: VideoCache,
    pub blobs: MockBlobStore,
    pub publisher: MockTaskPublisher,
}

impl Harness {
    pub fn new() -> Self {
        let repo = InMemoryVideoRepository::new();
        let backend = InMemoryCache::new();
        let cache = VideoCache::new(Arc::new(backend.clone()));
        let blobs = MockBlobStore::new();
        let publisher = MockTaskPublisher::new();

        let services = Services::build(ServiceDeps {
            cache: cache.clone(),
            repo: Arc::new(repo.clone()),
            ids: Arc::new(Snowflake::new(0, 1).unwrap()),
            blobs: Arc::new(blobs.clone()),
            publisher: Arc::new(publisher.clone()),
            scorer: HotScorer::default(),
        });

        Self {
            services,
            repo,
            backend,
            cache,
            blobs,
            publisher,
        }
    }

    /// Insert a published video with the given durable counters, created
    /// `age_secs` ago.
    pub async fn seed_video(&self, video_id: i64, views: i64, likes: i64, age_secs: i64) {
        let created_at = Utc::now() - ChronoDuration::seconds(age_secs);
        let meta = VideoMeta {
            video_id,
            user_id: 100,
            title: format!("video {}", video_id),
            description: format!("description of video {}", video_id),
            cover_url: String::new(),
            video_url: format!("http://minio.test/video/{}.mp4", video_id),
            duration_seconds: 15,
            status: VideoStatus::Published,
            created_at,
            deleted_at: None,
        };
        let score = HotScorer::default().score(views, likes, created_at, Utc::now());
        let mut stats = VideoStats::initial(video_id, score, created_at);
        stats.views = views;
        stats.likes = likes;
        self.repo.create_video(&meta, &stats).await.unwrap();
    }

    /// Wait for every supervised background task.
    pub async fn settle(&self) {
        assert!(
            self.services.tasks.drain(Duration::from_secs(5)).await,
            "background tasks did not settle"
        );
    }
}
