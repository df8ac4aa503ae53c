//! Cache key schema
//!
//! Every component reads and writes through these builders so the
//! reconciliation scan and the write paths agree on key shapes.

/// Key prefix shared by all video entities.
pub const PREFIX: &str = "video";

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Sorted set of video ids scored by hot score
    pub const HOT_RANK: &'static str = "video:hot_rank";

    /// Serialized profile
    /// Format: video:{video_id}
    pub fn profile(video_id: i64) -> String {
        format!("{}:{}", PREFIX, video_id)
    }

    /// View counter
    /// Format: video:views:{video_id}
    pub fn views(video_id: i64) -> String {
        format!("{}:views:{}", PREFIX, video_id)
    }

    /// Like counter
    /// Format: video:likes:{video_id}
    pub fn likes(video_id: i64) -> String {
        format!("{}:likes:{}", PREFIX, video_id)
    }

    /// Per-user like flag
    /// Format: video:like:{user_id}:{video_id}
    pub fn like_flag(user_id: i64, video_id: i64) -> String {
        format!("{}:like:{}:{}", PREFIX, user_id, video_id)
    }

    /// Search result page
    /// Format: video:search:{keyword}:{page}:{size}
    pub fn search(keyword: &str, page: i64, size: i64) -> String {
        format!("{}:search:{}:{}:{}", PREFIX, keyword, page, size)
    }

    /// Durable trending fallback page
    /// Format: video:trend:{page}:{size}
    pub fn trend(page: i64, size: i64) -> String {
        format!("{}:trend:{}:{}", PREFIX, page, size)
    }

    /// Pattern matching every view counter
    pub fn views_pattern() -> String {
        format!("{}:views:*", PREFIX)
    }

    /// Extract the video id from a view counter key.
    pub fn parse_views_key(key: &str) -> Option<i64> {
        key.strip_prefix("video:views:")?.parse().ok()
    }

    /// Entity label for metrics.
    pub fn entity(key: &str) -> &'static str {
        let mut parts = key.split(':');
        if parts.next() != Some(PREFIX) {
            return "unknown";
        }
        match parts.next() {
            Some("views") => "views",
            Some("likes") => "likes",
            Some("like") => "like_flag",
            Some("hot_rank") => "hot_rank",
            Some("search") => "search",
            Some("trend") => "trend",
            Some(id) if id.parse::<i64>().is_ok() => "profile",
            _ => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        assert_eq!(CacheKey::profile(42), "video:42");
        assert_eq!(CacheKey::views(42), "video:views:42");
        assert_eq!(CacheKey::likes(42), "video:likes:42");
        assert_eq!(CacheKey::like_flag(7, 42), "video:like:7:42");
        assert_eq!(CacheKey::search("cat", 2, 10), "video:search:cat:2:10");
        assert_eq!(CacheKey::HOT_RANK, "video:hot_rank");
    }

    #[test]
    fn test_parse_views_key() {
        assert_eq!(CacheKey::parse_views_key("video:views:123"), Some(123));
        assert_eq!(CacheKey::parse_views_key("video:views:abc"), None);
        assert_eq!(CacheKey::parse_views_key("video:likes:123"), None);
    }

    #[test]
    fn test_entity_labels() {
        assert_eq!(CacheKey::entity("video:42"), "profile");
        assert_eq!(CacheKey::entity("video:views:42"), "views");
        assert_eq!(CacheKey::entity("video:like:1:2"), "like_flag");
        assert_eq!(CacheKey::entity("feed:1"), "unknown");
    }
}
