//! Hot score policy
//!
//! `score = log10(views + likes + 1) - age_seconds / decay_seconds`
//!
//! Activity counts logarithmically, age linearly, so a video needs ten
//! times the engagement to hold its position after every `decay_seconds`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_HOT_DECAY_SECS, DEFAULT_NEW_VIDEO_OFFSET};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HotScorer {
    /// Seconds of age that cost one point.
    pub decay_seconds: f64,
    /// Added to the score of a video at submission time.
    pub new_video_offset: f64,
}

impl Default for HotScorer {
    fn default() -> Self {
        Self {
            decay_seconds: DEFAULT_HOT_DECAY_SECS,
            new_video_offset: DEFAULT_NEW_VIDEO_OFFSET,
        }
    }
}

impl HotScorer {
    pub fn new(decay_seconds: f64, new_video_offset: f64) -> Self {
        // A non-positive decay would invert or explode the age penalty.
        let decay_seconds = if decay_seconds > 0.0 {
            decay_seconds
        } else {
            DEFAULT_HOT_DECAY_SECS
        };
        Self {
            decay_seconds,
            new_video_offset,
        }
    }

    pub fn score(
        &self,
        views: i64,
        likes: i64,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> f64 {
        let activity = (views.max(0) + likes.max(0)) as f64;
        activity_term(activity) - age_seconds(created_at, now) / self.decay_seconds
    }

    /// Score of a brand-new video with no activity.
    pub fn initial_score(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        self.score(0, 0, created_at, now) + self.new_video_offset
    }
}

fn activity_term(activity: f64) -> f64 {
    (activity + 1.0).log10()
}

fn age_seconds(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - created_at).num_milliseconds().max(0) as f64 / 1000.0
}
