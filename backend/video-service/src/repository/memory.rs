use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use video_core::{LikeTransition, Pagination, VideoMeta, VideoProfile, VideoStats, VideoStatus};

use super::{check_same_video, RepoResult, RepositoryError, VideoRepository};

#[derive(Default)]
struct Tables {
    videos: HashMap<i64, VideoMeta>,
    stats: HashMap<i64, VideoStats>,
    likes: HashMap<(i64, i64), bool>,
}

/// Process-local [`VideoRepository`] for tests and local runs without MySQL.
///
/// Counts profile reads so callers can assert which reads reached the store,
/// and can be switched into a failing mode to exercise error paths.
#[derive(Clone, Default)]
pub struct InMemoryVideoRepository {
    tables: Arc<Mutex<Tables>>,
    profile_reads: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl InMemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get_profile` calls served so far.
    pub fn profile_reads(&self) -> usize {
        self.profile_reads.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail with a database error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn stats(&self, video_id: i64) -> Option<VideoStats> {
        self.lock().stats.get(&video_id).cloned()
    }

    pub fn video_count(&self) -> usize {
        self.lock().videos.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self) -> RepoResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn stats_mut(tables: &mut Tables, video_id: i64) -> &mut VideoStats {
        let created_at = tables
            .videos
            .get(&video_id)
            .map(|v| v.created_at)
            .unwrap_or_else(Utc::now);
        tables
            .stats
            .entry(video_id)
            .or_insert_with(|| VideoStats::initial(video_id, 0.0, created_at))
    }

    fn published(tables: &Tables) -> Vec<VideoProfile> {
        tables
            .videos
            .values()
            .filter(|v| v.status == VideoStatus::Published && v.deleted_at.is_none())
            .map(|v| VideoProfile::from_parts(v.clone(), tables.stats.get(&v.video_id).cloned()))
            .collect()
    }

    fn paginate(rows: Vec<VideoProfile>, page: Pagination) -> Vec<VideoProfile> {
        rows.into_iter()
            .skip(page.offset().max(0) as usize)
            .take(page.size.max(0) as usize)
            .collect()
    }
}

#[async_trait::async_trait]
impl VideoRepository for InMemoryVideoRepository {
    async fn create_video(&self, meta: &VideoMeta, stats: &VideoStats) -> RepoResult<()> {
        self.check()?;
        check_same_video(meta, stats)?;
        let mut tables = self.lock();
        if tables.videos.contains_key(&meta.video_id) {
            return Err(RepositoryError::Corrupt(format!(
                "duplicate video id {}",
                meta.video_id
            )));
        }
        tables.videos.insert(meta.video_id, meta.clone());
        tables.stats.insert(stats.video_id, stats.clone());
        Ok(())
    }

    async fn get_profile(&self, video_id: i64) -> RepoResult<VideoProfile> {
        self.profile_reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let tables = self.lock();
        let meta = tables
            .videos
            .get(&video_id)
            .filter(|v| v.status == VideoStatus::Published && v.deleted_at.is_none())
            .cloned()
            .ok_or(RepositoryError::NotFound(video_id))?;
        Ok(VideoProfile::from_parts(
            meta,
            tables.stats.get(&video_id).cloned(),
        ))
    }

    async fn update_views(&self, video_id: i64, views: i64) -> RepoResult<()> {
        self.check()?;
        let mut tables = self.lock();
        let stats = Self::stats_mut(&mut tables, video_id);
        stats.views = views;
        stats.updated_at = Utc::now();
        Ok(())
    }

    async fn update_hot_score(&self, video_id: i64, hot_score: f64) -> RepoResult<()> {
        self.check()?;
        let mut tables = self.lock();
        let stats = Self::stats_mut(&mut tables, video_id);
        stats.hot_score = hot_score;
        stats.updated_at = Utc::now();
        Ok(())
    }

    async fn search(
        &self,
        keyword: &str,
        _tags: &[String],
        page: Pagination,
    ) -> RepoResult<Vec<VideoProfile>> {
        self.check()?;
        let tables = self.lock();
        let mut rows: Vec<VideoProfile> = Self::published(&tables)
            .into_iter()
            .filter(|p| p.title.contains(keyword) || p.description.contains(keyword))
            .collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.video_id.cmp(&a.video_id))
        });
        Ok(Self::paginate(rows, page))
    }

    async fn list_by_hot_score(&self, page: Pagination) -> RepoResult<Vec<VideoProfile>> {
        self.check()?;
        let tables = self.lock();
        let mut rows = Self::published(&tables);
        rows.sort_by(|a, b| {
            b.hot_score
                .total_cmp(&a.hot_score)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(Self::paginate(rows, page))
    }

    async fn upsert_like(
        &self,
        user_id: i64,
        video_id: i64,
        liked: bool,
    ) -> RepoResult<LikeTransition> {
        self.check()?;
        let mut tables = self.lock();
        let current = tables.likes.get(&(user_id, video_id)).copied();

        // Unlike without a record: nothing to flip.
        let Some(currently_liked) = current.or(liked.then_some(false)) else {
            return Ok(LikeTransition::Unchanged);
        };

        let transition = LikeTransition::between(currently_liked, liked);
        tables.likes.insert((user_id, video_id), liked);
        if transition != LikeTransition::Unchanged {
            let stats = Self::stats_mut(&mut tables, video_id);
            stats.likes = (stats.likes + transition.delta()).max(0);
            stats.updated_at = Utc::now();
        }
        Ok(transition)
    }

    async fn like_status(&self, user_id: i64, video_id: i64) -> RepoResult<bool> {
        self.check()?;
        Ok(self
            .lock()
            .likes
            .get(&(user_id, video_id))
            .copied()
            .unwrap_or(false))
    }
}
