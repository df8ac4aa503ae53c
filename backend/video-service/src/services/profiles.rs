//! Cache-aside profile reads

use std::sync::Arc;

use tracing::warn;
use video_cache::VideoCache;
use video_core::VideoProfile;

use crate::error::Result;
use crate::repository::VideoRepository;

/// Reads profiles through the cache, falling back to the durable store.
///
/// A cache outage degrades to store reads; it never fails the request.
#[derive(Clone)]
pub struct ProfileReader {
    cache: VideoCache,
    repo: Arc<dyn VideoRepository>,
}

impl ProfileReader {
    pub fn new(cache: VideoCache, repo: Arc<dyn VideoRepository>) -> Self {
        Self { cache, repo }
    }

    pub async fn get(&self, video_id: i64) -> Result<VideoProfile> {
        match self.cache.get_profile(video_id).await {
            Ok(Some(profile)) => return Ok(profile),
            Ok(None) => {}
            Err(e) => warn!(video_id, error = %e, "Profile cache read failed, using store"),
        }

        let profile = self.repo.get_profile(video_id).await?;

        if let Err(e) = self.cache.set_profile(&profile).await {
            warn!(video_id, error = %e, "Failed to repopulate profile cache");
        }

        Ok(profile)
    }
}
