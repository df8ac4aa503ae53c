//! Durable store for video metadata, statistics and like records
//!
//! MySQL is the source of truth for existence and, after reconciliation, for
//! counts. Services depend on [`VideoRepository`] only.

mod memory;
mod mysql;

pub use memory::InMemoryVideoRepository;
pub use mysql::MySqlVideoRepository;

use thiserror::Error;
use video_core::{LikeTransition, Pagination, VideoMeta, VideoProfile, VideoStats};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("video {0} not found")]
    NotFound(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

fn check_same_video(meta: &VideoMeta, stats: &VideoStats) -> RepoResult<()> {
    if meta.video_id != stats.video_id {
        return Err(RepositoryError::Corrupt(format!(
            "stats for video {} attached to video {}",
            stats.video_id, meta.video_id
        )));
    }
    Ok(())
}

#[async_trait::async_trait]
pub trait VideoRepository: Send + Sync {
    /// Insert the metadata row and its initial stats row atomically; either
    /// both become visible or neither does.
    async fn create_video(&self, meta: &VideoMeta, stats: &VideoStats) -> RepoResult<()>;

    /// Metadata joined with stats; a missing stats row yields zero counters.
    /// Drafts and deleted videos are `NotFound`.
    async fn get_profile(&self, video_id: i64) -> RepoResult<VideoProfile>;

    async fn update_views(&self, video_id: i64, views: i64) -> RepoResult<()>;

    async fn update_hot_score(&self, video_id: i64, hot_score: f64) -> RepoResult<()>;

    /// Published videos whose title or description contains `keyword`, newest first.
    async fn search(
        &self,
        keyword: &str,
        tags: &[String],
        page: Pagination,
    ) -> RepoResult<Vec<VideoProfile>>;

    /// Published videos by stored hot score, highest first.
    async fn list_by_hot_score(&self, page: Pagination) -> RepoResult<Vec<VideoProfile>>;

    /// Move the (user, video) like record to `liked` and adjust the `likes`
    /// counter by the resulting transition, atomically.
    async fn upsert_like(&self, user_id: i64, video_id: i64, liked: bool)
        -> RepoResult<LikeTransition>;

    /// Durable like state; `false` when no record exists.
    async fn like_status(&self, user_id: i64, video_id: i64) -> RepoResult<bool>;
}
