//! Like / unlike propagation
//!
//! The durable write is the success boundary. Counter, flag and rank updates
//! follow on a supervised task and never fail the caller.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{info, warn};
use video_cache::VideoCache;
use video_core::LikeTransition;

use super::profiles::ProfileReader;
use super::ranking::HotScoreRefresher;
use crate::error::{AppError, Result};
use crate::repository::VideoRepository;
use crate::tasks::{TaskOutcome, TaskSupervisor};

pub struct LikeService {
    cache: VideoCache,
    repo: Arc<dyn VideoRepository>,
    profiles: ProfileReader,
    refresher: Arc<dyn HotScoreRefresher>,
    tasks: TaskSupervisor,
}

/// Result of a like or unlike. `propagated` resolves when the cache side
/// has been updated; callers that do not care can drop it.
#[derive(Debug)]
pub struct LikeUpdate {
    pub transition: LikeTransition,
    pub propagated: oneshot::Receiver<TaskOutcome>,
}

impl LikeService {
    pub fn new(
        cache: VideoCache,
        repo: Arc<dyn VideoRepository>,
        profiles: ProfileReader,
        refresher: Arc<dyn HotScoreRefresher>,
        tasks: TaskSupervisor,
    ) -> Self {
        Self {
            cache,
            repo,
            profiles,
            refresher,
            tasks,
        }
    }

    pub async fn like(&self, user_id: i64, video_id: i64) -> Result<LikeUpdate> {
        self.set_liked(user_id, video_id, true).await
    }

    pub async fn unlike(&self, user_id: i64, video_id: i64) -> Result<LikeUpdate> {
        self.set_liked(user_id, video_id, false).await
    }

    /// Like state of `user_id` for `video_id`; the 24h flag first, then the store.
    pub async fn is_liked(&self, user_id: i64, video_id: i64) -> Result<bool> {
        match self.cache.like_flag(user_id, video_id).await {
            Ok(Some(liked)) => return Ok(liked),
            Ok(None) => {}
            Err(e) => warn!(user_id, video_id, error = %e, "Like flag read failed, using store"),
        }

        let liked = self.repo.like_status(user_id, video_id).await?;
        if let Err(e) = self.cache.set_like_flag(user_id, video_id, liked).await {
            warn!(user_id, video_id, error = %e, "Failed to repopulate like flag");
        }
        Ok(liked)
    }

    async fn set_liked(&self, user_id: i64, video_id: i64, liked: bool) -> Result<LikeUpdate> {
        let profile = self.profiles.get(video_id).await?;

        let transition = self.repo.upsert_like(user_id, video_id, liked).await?;
        info!(user_id, video_id, ?transition, "Like state written");

        let cache = self.cache.clone();
        let refresher = self.refresher.clone();
        // Seed from the durable count as it was before this transition.
        let seed = profile.likes;
        let propagated = self.tasks.spawn("like_propagation", async move {
            if transition != LikeTransition::Unchanged {
                cache.adjust_likes(video_id, transition.delta(), seed).await?;
            }
            cache.set_like_flag(user_id, video_id, liked).await?;
            refresher.refresh(video_id).await?;
            Ok::<(), AppError>(())
        });

        Ok(LikeUpdate {
            transition,
            propagated,
        })
    }
}
