//! Core video data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE, MAX_PAGE_SIZE};

/// Video status enumeration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    #[default]
    Published,
    Draft,
    Deleted,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Published => "published",
            VideoStatus::Draft => "draft",
            VideoStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown video status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for VideoStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "published" => Ok(VideoStatus::Published),
            "draft" => Ok(VideoStatus::Draft),
            "deleted" => Ok(VideoStatus::Deleted),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Identity and descriptive fields of a video.
///
/// Written once at submission; only `status`/`deleted_at` change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMeta {
    pub video_id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub cover_url: String,
    pub video_url: String,
    pub duration_seconds: i64,
    pub status: VideoStatus,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Mutable counters, stored apart from the metadata row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStats {
    pub video_id: i64,
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    pub hot_score: f64,
    pub updated_at: DateTime<Utc>,
}

impl VideoStats {
    /// Zero counters for a just-submitted video.
    pub fn initial(video_id: i64, hot_score: f64, now: DateTime<Utc>) -> Self {
        Self {
            video_id,
            views: 0,
            likes: 0,
            comments: 0,
            hot_score,
            updated_at: now,
        }
    }
}

/// Read model: metadata joined with stats. This is what gets cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoProfile {
    #[serde(default)]
    pub video_id: i64,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_url: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub duration_seconds: i64,
    #[serde(default)]
    pub status: VideoStatus,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub comments: i64,
    #[serde(default)]
    pub hot_score: f64,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl VideoProfile {
    /// Join a metadata row with its stats row; a missing stats row means zeros.
    pub fn from_parts(meta: VideoMeta, stats: Option<VideoStats>) -> Self {
        let (views, likes, comments, hot_score, updated_at) = match stats {
            Some(s) => (s.views, s.likes, s.comments, s.hot_score, s.updated_at),
            None => (0, 0, 0, 0.0, meta.created_at),
        };
        Self {
            video_id: meta.video_id,
            user_id: meta.user_id,
            title: meta.title,
            description: meta.description,
            cover_url: meta.cover_url,
            video_url: meta.video_url,
            duration_seconds: meta.duration_seconds,
            status: meta.status,
            views,
            likes,
            comments,
            hot_score,
            created_at: meta.created_at,
            updated_at,
        }
    }

    /// The zero value: no id, never a real video.
    pub fn is_empty(&self) -> bool {
        self.video_id == 0
    }
}

/// Outcome of a durable like/unlike write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeTransition {
    /// not-liked -> liked
    Liked,
    /// liked -> not-liked
    Unliked,
    /// already in the requested state
    Unchanged,
}

impl LikeTransition {
    /// Change applied to the durable `likes` counter.
    pub fn delta(&self) -> i64 {
        match self {
            LikeTransition::Liked => 1,
            LikeTransition::Unliked => -1,
            LikeTransition::Unchanged => 0,
        }
    }

    pub fn is_new_like(&self) -> bool {
        matches!(self, LikeTransition::Liked)
    }

    /// Resolve the transition from the current durable state and the request.
    pub fn between(currently_liked: bool, want_liked: bool) -> Self {
        match (currently_liked, want_liked) {
            (false, true) => LikeTransition::Liked,
            (true, false) => LikeTransition::Unliked,
            _ => LikeTransition::Unchanged,
        }
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub size: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("page must be within 1..={MAX_PAGE}, got {0}", MAX_PAGE = MAX_PAGE)]
    Page(i64),
    #[error("size must be within 1..={MAX_PAGE_SIZE}, got {0}", MAX_PAGE_SIZE = MAX_PAGE_SIZE)]
    Size(i64),
}

impl Pagination {
    pub fn new(page: i64, size: i64) -> Result<Self, PaginationError> {
        if !(1..=MAX_PAGE).contains(&page) {
            return Err(PaginationError::Page(page));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&size) {
            return Err(PaginationError::Size(size));
        }
        Ok(Self { page, size })
    }

    /// Row offset for SQL `LIMIT size OFFSET offset`.
    ///
    /// Saturates, since the fields are public and can bypass [`Pagination::new`].
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.size.max(0))
    }

    /// Inclusive rank range `(start, end)` for a sorted-set range query.
    ///
    /// Never negative: Redis reads negative ranks from the tail.
    pub fn rank_range(&self) -> (isize, isize) {
        let start = isize::try_from(self.offset()).unwrap_or(isize::MAX);
        let end = start.saturating_add(self.size.max(1) as isize - 1);
        (start, end)
    }
}
