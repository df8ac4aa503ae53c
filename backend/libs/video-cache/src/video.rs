//! Typed video cache operations

use std::sync::Arc;

use tracing::{debug, warn};
use video_core::VideoProfile;

use crate::{ttl, CacheBackend, CacheError, CacheKey, CacheMetrics, CacheResult};

/// Typed facade over a [`CacheBackend`] for the video read/write paths.
#[derive(Clone)]
pub struct VideoCache {
    backend: Arc<dyn CacheBackend>,
    metrics: CacheMetrics,
}

impl VideoCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            metrics: CacheMetrics::new(),
        }
    }

    pub async fn ping(&self) -> CacheResult<()> {
        self.backend.ping().await
    }

    // ========== Profiles ==========

    /// Cached profile, or `None` on a miss.
    ///
    /// An entry that does not decode, or decodes to the empty profile, is a
    /// miss and is evicted.
    pub async fn get_profile(&self, video_id: i64) -> CacheResult<Option<VideoProfile>> {
        let key = CacheKey::profile(video_id);
        let raw = match self.backend.get(&key).await {
            Ok(raw) => raw,
            Err(e) => {
                self.metrics.record_error(&key, e.kind());
                return Err(e);
            }
        };

        let Some(raw) = raw else {
            debug!(key = %key, "Cache miss");
            self.metrics.record_miss(&key);
            return Ok(None);
        };

        match serde_json::from_str::<VideoProfile>(&raw) {
            Ok(profile) if !profile.is_empty() => {
                debug!(key = %key, "Cache hit");
                self.metrics.record_hit(&key);
                Ok(Some(profile))
            }
            Ok(_) => {
                warn!(key = %key, "Cache hit on empty profile, treating as miss");
                self.evict(&key, "empty").await;
                Ok(None)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache deserialization failed");
                self.evict(&key, "deserialize").await;
                Ok(None)
            }
        }
    }

    /// Cache a profile for [`ttl::PROFILE`] seconds. Empty profiles are refused.
    pub async fn set_profile(&self, profile: &VideoProfile) -> CacheResult<()> {
        if profile.is_empty() {
            let key = CacheKey::profile(profile.video_id);
            self.metrics.record_refusal(&key);
            return Err(CacheError::Refused("profile has no video id"));
        }

        let key = CacheKey::profile(profile.video_id);
        let data = serde_json::to_string(profile)?;
        self.write(&key, &data, Some(ttl::PROFILE)).await
    }

    // ========== Counters ==========

    /// Increment the view counter, seeding it with `seed` when it is absent.
    pub async fn incr_views(&self, video_id: i64, seed: i64) -> CacheResult<i64> {
        self.incr_seeded(&CacheKey::views(video_id), 1, seed).await
    }

    pub async fn views(&self, video_id: i64) -> CacheResult<Option<i64>> {
        self.read_counter(&CacheKey::views(video_id)).await
    }

    /// Read a view counter by its full key (reconciliation path).
    pub async fn views_by_key(&self, key: &str) -> CacheResult<Option<i64>> {
        self.read_counter(key).await
    }

    /// Apply `delta` to the like counter, seeding it with `seed` when absent.
    /// The counter never goes below zero.
    pub async fn adjust_likes(&self, video_id: i64, delta: i64, seed: i64) -> CacheResult<i64> {
        let key = CacheKey::likes(video_id);
        let value = self.incr_seeded(&key, delta, seed).await?;
        if value < 0 {
            self.write(&key, "0", None).await?;
            return Ok(0);
        }
        Ok(value)
    }

    pub async fn likes(&self, video_id: i64) -> CacheResult<Option<i64>> {
        self.read_counter(&CacheKey::likes(video_id)).await
    }

    /// Keys of every view counter currently cached.
    pub async fn scan_view_counters(&self) -> CacheResult<Vec<String>> {
        self.backend.scan_match(&CacheKey::views_pattern()).await
    }

    // ========== Like flags ==========

    pub async fn set_like_flag(&self, user_id: i64, video_id: i64, liked: bool) -> CacheResult<()> {
        let key = CacheKey::like_flag(user_id, video_id);
        let value = if liked { "1" } else { "0" };
        self.write(&key, value, Some(ttl::LIKE_FLAG)).await
    }

    pub async fn like_flag(&self, user_id: i64, video_id: i64) -> CacheResult<Option<bool>> {
        let key = CacheKey::like_flag(user_id, video_id);
        match self.backend.get(&key).await? {
            Some(v) if v == "1" => Ok(Some(true)),
            Some(v) if v == "0" => Ok(Some(false)),
            Some(other) => {
                warn!(key = %key, value = %other, "Unexpected like flag value");
                self.evict(&key, "invalid_flag").await;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    // ========== Hot ranking ==========

    /// Insert or update a video's score in the ranking index.
    pub async fn upsert_rank(&self, video_id: i64, score: f64) -> CacheResult<()> {
        self.backend
            .zadd(CacheKey::HOT_RANK, &video_id.to_string(), score)
            .await
    }

    /// Ranking slice `start..=end` by descending score.
    /// Members that are not video ids are skipped.
    pub async fn rank_range(&self, start: isize, end: isize) -> CacheResult<Vec<(i64, f64)>> {
        let members = self
            .backend
            .zrevrange_with_scores(CacheKey::HOT_RANK, start, end)
            .await?;

        Ok(members
            .into_iter()
            .filter_map(|(member, score)| match member.parse::<i64>() {
                Ok(id) => Some((id, score)),
                Err(_) => {
                    warn!(member = %member, "Skipping malformed hot rank member");
                    None
                }
            })
            .collect())
    }

    // ========== Result pages ==========

    pub async fn get_page(&self, key: &str) -> CacheResult<Option<Vec<VideoProfile>>> {
        let Some(raw) = self.backend.get(key).await? else {
            self.metrics.record_miss(key);
            return Ok(None);
        };
        match serde_json::from_str::<Vec<VideoProfile>>(&raw) {
            Ok(page) => {
                self.metrics.record_hit(key);
                Ok(Some(page))
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cached page deserialization failed");
                self.evict(key, "deserialize").await;
                Ok(None)
            }
        }
    }

    /// Cache a result page for [`ttl::SEARCH`] seconds.
    /// Returns `false` without writing when the page is empty.
    pub async fn set_page(&self, key: &str, page: &[VideoProfile]) -> CacheResult<bool> {
        if page.is_empty() {
            debug!(key = %key, "Skipping cache write for empty page");
            return Ok(false);
        }
        let data = serde_json::to_string(page)?;
        self.write(key, &data, Some(ttl::SEARCH)).await?;
        Ok(true)
    }

    // ========== Internals ==========

    async fn write(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> CacheResult<()> {
        match self.backend.set(key, value, ttl_secs).await {
            Ok(()) => {
                self.metrics.record_write(key);
                Ok(())
            }
            Err(e) => {
                self.metrics.record_error(key, e.kind());
                Err(e)
            }
        }
    }

    async fn incr_seeded(&self, key: &str, delta: i64, seed: i64) -> CacheResult<i64> {
        // SET NX then INCRBY: concurrent first writers seed once and every
        // increment lands on top of the seed.
        self.backend.set_nx(key, &seed.max(0).to_string()).await?;
        let value = self.backend.incr_by(key, delta).await?;
        self.metrics.record_write(key);
        Ok(value)
    }

    async fn read_counter(&self, key: &str) -> CacheResult<Option<i64>> {
        match self.backend.get(key).await? {
            Some(raw) => raw
                .parse::<i64>()
                .map(Some)
                .map_err(|_| CacheError::InvalidData(format!("counter {key} = {raw:?}"))),
            None => Ok(None),
        }
    }

    async fn evict(&self, key: &str, reason: &str) {
        self.metrics.record_error(key, reason);
        if let Err(e) = self.backend.del(key).await {
            warn!(key = %key, error = %e, "Failed to evict cache entry");
        }
    }
}
