//! Submission and read paths for videos

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use snowflake_id::Snowflake;
use tracing::{info, warn};
use validator::Validate;
use video_cache::{CacheKey, VideoCache};
use video_core::constants::{
    MAX_COVER_URL_LENGTH, MAX_DESCRIPTION_LENGTH, MAX_TITLE_LENGTH, VIDEO_OBJECT_EXTENSION,
};
use video_core::{HotScorer, Pagination, VideoMeta, VideoProfile, VideoStats, VideoStatus};

use super::profiles::ProfileReader;
use super::queue::{TaskPublisher, UploadTask};
use super::ranking::RankingEngine;
use super::storage::BlobStore;
use super::views::ViewAggregator;
use crate::error::{AppError, Result};
use crate::repository::VideoRepository;
use crate::tasks::TaskSupervisor;

#[derive(Debug, Clone, Validate)]
pub struct SubmitVideo {
    #[validate(length(min = 1, max = (MAX_TITLE_LENGTH as u64)))]
    pub title: String,
    #[validate(length(max = (MAX_DESCRIPTION_LENGTH as u64)))]
    pub description: String,
    #[validate(length(max = (MAX_COVER_URL_LENGTH as u64)))]
    pub cover_url: String,
    #[validate(range(min = 0))]
    pub duration_seconds: i64,
    pub payload: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmittedVideo {
    pub video_id: i64,
    pub video_url: String,
}

pub struct VideoService {
    cache: VideoCache,
    repo: Arc<dyn VideoRepository>,
    profiles: ProfileReader,
    ranking: Arc<RankingEngine>,
    views: Arc<ViewAggregator>,
    ids: Arc<Snowflake>,
    blobs: Arc<dyn BlobStore>,
    publisher: Arc<dyn TaskPublisher>,
    tasks: TaskSupervisor,
    scorer: HotScorer,
}

impl VideoService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: VideoCache,
        repo: Arc<dyn VideoRepository>,
        profiles: ProfileReader,
        ranking: Arc<RankingEngine>,
        views: Arc<ViewAggregator>,
        ids: Arc<Snowflake>,
        blobs: Arc<dyn BlobStore>,
        publisher: Arc<dyn TaskPublisher>,
        tasks: TaskSupervisor,
    ) -> Self {
        let scorer = *ranking.scorer();
        Self {
            cache,
            repo,
            profiles,
            ranking,
            views,
            ids,
            blobs,
            publisher,
            tasks,
            scorer,
        }
    }

    /// Store the payload, queue it for processing, then persist metadata and
    /// zeroed stats. The rank insert happens in the background.
    pub async fn submit(&self, user_id: i64, video: SubmitVideo) -> Result<SubmittedVideo> {
        video.validate()?;
        if video.payload.is_empty() {
            return Err(AppError::ValidationError("video payload is empty".into()));
        }

        let video_id = self.ids.next_id()?;
        let object = format!("{}.{}", video_id, VIDEO_OBJECT_EXTENSION);
        let video_url = self
            .blobs
            .put_object(&object, video.payload, "video/mp4")
            .await?;

        self.publisher
            .publish(&UploadTask {
                video_id,
                user_id,
                object,
            })
            .await?;

        let now = Utc::now();
        let meta = VideoMeta {
            video_id,
            user_id,
            title: video.title,
            description: video.description,
            cover_url: video.cover_url,
            video_url: video_url.clone(),
            duration_seconds: video.duration_seconds,
            status: VideoStatus::Published,
            created_at: now,
            deleted_at: None,
        };
        let score = self.scorer.initial_score(now, now);
        self.repo
            .create_video(&meta, &VideoStats::initial(video_id, score, now))
            .await?;

        let cache = self.cache.clone();
        self.tasks.spawn("hot_rank_insert", async move {
            cache.upsert_rank(video_id, score).await
        });

        info!(video_id, user_id, "Video submitted");
        Ok(SubmittedVideo {
            video_id,
            video_url,
        })
    }

    /// Profile with live counters. Counts as one view.
    pub async fn get(&self, video_id: i64) -> Result<VideoProfile> {
        let mut profile = self.profiles.get(video_id).await?;

        match self.views.record_view(&profile).await {
            Ok(views) => profile.views = views,
            Err(e) => warn!(video_id, error = %e, "Failed to count view"),
        }
        match self.cache.likes(video_id).await {
            Ok(Some(likes)) => profile.likes = likes,
            Ok(None) => {}
            Err(e) => warn!(video_id, error = %e, "Failed to read like counter"),
        }

        Ok(profile)
    }

    pub async fn search(
        &self,
        keyword: &str,
        tags: &[String],
        page: Pagination,
    ) -> Result<Vec<VideoProfile>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(AppError::ValidationError("keyword must not be empty".into()));
        }

        let key = CacheKey::search(keyword, page.page, page.size);
        match self.cache.get_page(&key).await {
            Ok(Some(videos)) => return Ok(videos),
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Search cache read failed"),
        }

        let videos = self.repo.search(keyword, tags, page).await?;
        if let Err(e) = self.cache.set_page(&key, &videos).await {
            warn!(key = %key, error = %e, "Failed to cache search page");
        }
        Ok(videos)
    }

    pub async fn trending(&self, page: Pagination) -> Result<Vec<VideoProfile>> {
        self.ranking.trending(page).await
    }
}
