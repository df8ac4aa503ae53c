//! Video platform core models and types
//!
//! Shared data structures for video-service, the cache layer and the ranking policy

pub mod constants;
pub mod hot;
pub mod models;

pub use hot::HotScorer;
pub use models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn meta(id: i64) -> VideoMeta {
        VideoMeta {
            video_id: id,
            user_id: 42,
            title: "cats".to_string(),
            description: "cats doing things".to_string(),
            cover_url: String::new(),
            video_url: format!("https://cdn.example.com/{id}.mp4"),
            duration_seconds: 12,
            status: VideoStatus::Published,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_profile_without_stats_has_zero_counters() {
        let profile = VideoProfile::from_parts(meta(7), None);
        assert_eq!(profile.video_id, 7);
        assert_eq!((profile.views, profile.likes, profile.comments), (0, 0, 0));
        assert!(!profile.is_empty());
    }

    #[test]
    fn test_profile_with_stats() {
        let m = meta(8);
        let mut stats = VideoStats::initial(8, -1.0, m.created_at);
        stats.views = 30;
        stats.likes = 4;
        let profile = VideoProfile::from_parts(m, Some(stats));
        assert_eq!(profile.views, 30);
        assert_eq!(profile.likes, 4);
        assert_eq!(profile.hot_score, -1.0);
    }

    #[test]
    fn test_default_profile_is_empty() {
        assert!(VideoProfile::default().is_empty());
        let decoded: VideoProfile = serde_json::from_str("{}").unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [VideoStatus::Published, VideoStatus::Draft, VideoStatus::Deleted] {
            assert_eq!(status.as_str().parse::<VideoStatus>().unwrap(), status);
        }
        assert!("archived".parse::<VideoStatus>().is_err());
    }

    #[test]
    fn test_like_transitions() {
        assert_eq!(LikeTransition::between(false, true), LikeTransition::Liked);
        assert_eq!(LikeTransition::between(true, true), LikeTransition::Unchanged);
        assert_eq!(LikeTransition::between(true, false), LikeTransition::Unliked);
        assert_eq!(LikeTransition::between(false, false), LikeTransition::Unchanged);
        assert_eq!(LikeTransition::Unliked.delta(), -1);
        assert!(LikeTransition::Liked.is_new_like());
    }

    #[test]
    fn test_pagination_ranges() {
        let first = Pagination::new(1, 10).unwrap();
        let second = Pagination::new(2, 10).unwrap();
        assert_eq!(first.rank_range(), (0, 9));
        assert_eq!(second.rank_range(), (10, 19));
        assert_eq!(second.offset(), 10);
        assert_eq!(Pagination::new(0, 10), Err(PaginationError::Page(0)));
        assert_eq!(Pagination::new(1, 0), Err(PaginationError::Size(0)));
        assert_eq!(Pagination::new(1, 101), Err(PaginationError::Size(101)));
    }

    #[test]
    fn test_pagination_rejects_pages_that_overflow() {
        assert_eq!(
            Pagination::new(i64::MAX, 100),
            Err(PaginationError::Page(i64::MAX))
        );
        assert_eq!(
            Pagination::new(constants::MAX_PAGE + 1, 10),
            Err(PaginationError::Page(constants::MAX_PAGE + 1))
        );

        let last = Pagination::new(constants::MAX_PAGE, constants::MAX_PAGE_SIZE).unwrap();
        let (start, end) = last.rank_range();
        assert!(start >= 0 && end >= start);
        assert!(last.offset() > 0);

        // Fields are public; a hand-built value still never goes negative.
        let raw = Pagination { page: i64::MAX, size: 100 };
        let (start, end) = raw.rank_range();
        assert!(start >= 0 && end >= start);
        assert_eq!(raw.offset(), i64::MAX);
    }
}
