//! Hot score maintenance and the trending query

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use video_cache::{CacheKey, CacheResult, VideoCache};
use video_core::{HotScorer, Pagination, VideoProfile};

use super::profiles::ProfileReader;
use crate::error::Result;
use crate::repository::VideoRepository;

/// Recompute and publish a video's hot score.
///
/// The view and like paths depend on this seam rather than on
/// [`RankingEngine`] so a cross-service deployment can route it over the
/// internal endpoint instead.
#[async_trait::async_trait]
pub trait HotScoreRefresher: Send + Sync {
    async fn refresh(&self, video_id: i64) -> Result<f64>;
}

pub struct RankingEngine {
    cache: VideoCache,
    repo: Arc<dyn VideoRepository>,
    profiles: ProfileReader,
    scorer: HotScorer,
}

impl RankingEngine {
    pub fn new(
        cache: VideoCache,
        repo: Arc<dyn VideoRepository>,
        profiles: ProfileReader,
        scorer: HotScorer,
    ) -> Self {
        Self {
            cache,
            repo,
            profiles,
            scorer,
        }
    }

    pub fn scorer(&self) -> &HotScorer {
        &self.scorer
    }

    /// Page of the ranking by descending hot score.
    ///
    /// Ids that no longer resolve to a profile are skipped. When the index is
    /// unreachable or empty the durable ordering is served instead.
    pub async fn trending(&self, page: Pagination) -> Result<Vec<VideoProfile>> {
        let (start, end) = page.rank_range();
        let ranked = match self.cache.rank_range(start, end).await {
            Ok(ranked) => ranked,
            Err(e) => {
                warn!(error = %e, "Hot rank unavailable, serving durable ordering");
                return self.durable_trending(page).await;
            }
        };

        if ranked.is_empty() {
            if page.page == 1 || self.index_is_empty().await {
                debug!(page = page.page, "Hot rank empty, serving durable ordering");
                return self.durable_trending(page).await;
            }
            return Ok(Vec::new());
        }

        let mut videos = Vec::with_capacity(ranked.len());
        for (video_id, score) in ranked {
            let mut profile = match self.profiles.get(video_id).await {
                Ok(profile) => profile,
                Err(e) => {
                    warn!(video_id, error = %e, "Skipping unresolvable ranked video");
                    continue;
                }
            };
            profile.hot_score = score;
            if let Some(views) = self.live_counter(video_id, self.cache.views(video_id).await) {
                profile.views = views;
            }
            videos.push(profile);
        }

        Ok(videos)
    }

    async fn index_is_empty(&self) -> bool {
        matches!(self.cache.rank_range(0, 0).await, Ok(head) if head.is_empty())
    }

    async fn durable_trending(&self, page: Pagination) -> Result<Vec<VideoProfile>> {
        let key = CacheKey::trend(page.page, page.size);
        match self.cache.get_page(&key).await {
            Ok(Some(videos)) => return Ok(videos),
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Trending page cache read failed"),
        }

        let videos = self.repo.list_by_hot_score(page).await?;
        if let Err(e) = self.cache.set_page(&key, &videos).await {
            warn!(key = %key, error = %e, "Failed to cache trending page");
        }
        Ok(videos)
    }

    fn live_counter(&self, video_id: i64, read: CacheResult<Option<i64>>) -> Option<i64> {
        match read {
            Ok(value) => value,
            Err(e) => {
                warn!(video_id, error = %e, "Counter read failed, using profile value");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl HotScoreRefresher for RankingEngine {
    async fn refresh(&self, video_id: i64) -> Result<f64> {
        let profile = self.profiles.get(video_id).await?;

        let views = self
            .live_counter(video_id, self.cache.views(video_id).await)
            .unwrap_or(profile.views);
        let likes = self
            .live_counter(video_id, self.cache.likes(video_id).await)
            .unwrap_or(profile.likes);

        let score = self.scorer.score(views, likes, profile.created_at, Utc::now());

        // The durable score is still written when the index is down; the next
        // refresh republishes it.
        if let Err(e) = self.cache.upsert_rank(video_id, score).await {
            warn!(video_id, error = %e, "Failed to upsert hot rank");
        }
        self.repo.update_hot_score(video_id, score).await?;

        debug!(video_id, views, likes, score, "Hot score refreshed");
        Ok(score)
    }
}
