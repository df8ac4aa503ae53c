//! Video platform constants

/// Maximum video title length
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum video description length
pub const MAX_DESCRIPTION_LENGTH: usize = 5000;

/// Maximum cover image URL length
pub const MAX_COVER_URL_LENGTH: usize = 512;

/// Largest page a list endpoint will serve
pub const MAX_PAGE_SIZE: i64 = 100;

/// Largest page number accepted; keeps `page * MAX_PAGE_SIZE` inside `i64`
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// Default page size for search/trending
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Profile cache TTL (30 minutes)
pub const PROFILE_TTL_SECS: u64 = 30 * 60;

/// Per-user like flag TTL (24 hours)
pub const LIKE_FLAG_TTL_SECS: u64 = 24 * 60 * 60;

/// Search/trending result cache TTL (5 minutes)
pub const SEARCH_TTL_SECS: u64 = 5 * 60;

/// Seconds of age that cost one point of hot score (6 hours)
pub const DEFAULT_HOT_DECAY_SECS: f64 = 6.0 * 60.0 * 60.0;

/// Extra score applied to a freshly submitted video
pub const DEFAULT_NEW_VIDEO_OFFSET: f64 = -1.0;

/// View counter reconciliation interval (5 minutes)
pub const VIEW_SYNC_INTERVAL_SECS: u64 = 5 * 60;

/// Snowflake worker slot of the video service
pub const VIDEO_SERVICE_WORKER_ID: i64 = 1;

/// Object key suffix for uploaded video payloads
pub const VIDEO_OBJECT_EXTENSION: &str = "mp4";
