use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::debug;
use video_core::{LikeTransition, Pagination, VideoMeta, VideoProfile, VideoStats, VideoStatus};

use super::{check_same_video, RepoResult, RepositoryError, VideoRepository};

const PROFILE_COLUMNS: &str = r#"
    v.video_id, v.user_id, v.title, v.description, v.cover_url, v.video_url,
    v.duration_seconds, v.status, v.created_at,
    COALESCE(s.views, 0) AS views,
    COALESCE(s.likes, 0) AS likes,
    COALESCE(s.comments, 0) AS comments,
    COALESCE(s.hot_score, 0) AS hot_score,
    COALESCE(s.updated_at, v.created_at) AS updated_at
"#;

#[derive(Clone)]
pub struct MySqlVideoRepository {
    pool: MySqlPool,
}

impl MySqlVideoRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn profile_from_row(row: &MySqlRow) -> RepoResult<VideoProfile> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<VideoStatus>()
        .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;

    Ok(VideoProfile {
        video_id: row.try_get("video_id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        cover_url: row.try_get("cover_url")?,
        video_url: row.try_get("video_url")?,
        duration_seconds: row.try_get("duration_seconds")?,
        status,
        views: row.try_get("views")?,
        likes: row.try_get("likes")?,
        comments: row.try_get("comments")?,
        hot_score: row.try_get("hot_score")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

/// Escape `%`, `_` and `\` so user input matches literally inside LIKE.
fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait::async_trait]
impl VideoRepository for MySqlVideoRepository {
    async fn create_video(&self, meta: &VideoMeta, stats: &VideoStats) -> RepoResult<()> {
        check_same_video(meta, stats)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO videos (video_id, user_id, title, description, cover_url, video_url,
                                duration_seconds, status, created_at, deleted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(meta.video_id)
        .bind(meta.user_id)
        .bind(&meta.title)
        .bind(&meta.description)
        .bind(&meta.cover_url)
        .bind(&meta.video_url)
        .bind(meta.duration_seconds)
        .bind(meta.status.as_str())
        .bind(meta.created_at)
        .bind(meta.deleted_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO video_stats (video_id, views, likes, comments, hot_score, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(stats.video_id)
        .bind(stats.views)
        .bind(stats.likes)
        .bind(stats.comments)
        .bind(stats.hot_score)
        .bind(stats.updated_at)
        .execute(&mut *tx)
        .await?;

        // Dropping `tx` on an early return rolls back the metadata row.
        tx.commit().await?;
        debug!(video_id = meta.video_id, "Video and stats rows created");
        Ok(())
    }

    async fn get_profile(&self, video_id: i64) -> RepoResult<VideoProfile> {
        let sql = format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM videos v
            LEFT JOIN video_stats s ON s.video_id = v.video_id
            WHERE v.video_id = ? AND v.status = 'published' AND v.deleted_at IS NULL
            "#
        );
        let row = sqlx::query(&sql)
            .bind(video_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound(video_id))?;

        profile_from_row(&row)
    }

    async fn update_views(&self, video_id: i64, views: i64) -> RepoResult<()> {
        // Upsert: a video submitted before its stats row existed still gets one.
        sqlx::query(
            r#"
            INSERT INTO video_stats (video_id, views, likes, comments, hot_score, updated_at)
            VALUES (?, ?, 0, 0, 0, ?)
            ON DUPLICATE KEY UPDATE views = VALUES(views), updated_at = VALUES(updated_at)
            "#,
        )
        .bind(video_id)
        .bind(views)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_hot_score(&self, video_id: i64, hot_score: f64) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO video_stats (video_id, views, likes, comments, hot_score, updated_at)
            VALUES (?, 0, 0, 0, ?, ?)
            ON DUPLICATE KEY UPDATE hot_score = VALUES(hot_score), updated_at = VALUES(updated_at)
            "#,
        )
        .bind(video_id)
        .bind(hot_score)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn search(
        &self,
        keyword: &str,
        tags: &[String],
        page: Pagination,
    ) -> RepoResult<Vec<VideoProfile>> {
        if !tags.is_empty() {
            debug!(tags = ?tags, "Tag filters are not indexed, ignoring");
        }

        let sql = format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM videos v
            LEFT JOIN video_stats s ON s.video_id = v.video_id
            WHERE v.status = 'published' AND v.deleted_at IS NULL
              AND (v.title LIKE ? OR v.description LIKE ?)
            ORDER BY v.created_at DESC, v.video_id DESC
            LIMIT ? OFFSET ?
            "#
        );
        let pattern = like_pattern(keyword);
        let rows = sqlx::query(&sql)
            .bind(&pattern)
            .bind(&pattern)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(profile_from_row).collect()
    }

    async fn list_by_hot_score(&self, page: Pagination) -> RepoResult<Vec<VideoProfile>> {
        let sql = format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM videos v
            LEFT JOIN video_stats s ON s.video_id = v.video_id
            WHERE v.status = 'published' AND v.deleted_at IS NULL
            ORDER BY COALESCE(s.hot_score, 0) DESC, v.created_at DESC
            LIMIT ? OFFSET ?
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(profile_from_row).collect()
    }

    async fn upsert_like(
        &self,
        user_id: i64,
        video_id: i64,
        liked: bool,
    ) -> RepoResult<LikeTransition> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if liked {
            sqlx::query(
                r#"
                INSERT IGNORE INTO video_likes (user_id, video_id, is_liked, created_at, updated_at)
                VALUES (?, ?, 0, ?, ?)
                "#,
            )
            .bind(user_id)
            .bind(video_id)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let current = sqlx::query(
            "SELECT is_liked FROM video_likes WHERE user_id = ? AND video_id = ? FOR UPDATE",
        )
        .bind(user_id)
        .bind(video_id)
        .fetch_optional(&mut *tx)
        .await?;

        // Unlike without a record: nothing to flip.
        let Some(row) = current else {
            tx.commit().await?;
            return Ok(LikeTransition::Unchanged);
        };
        let currently_liked: bool = row.try_get("is_liked")?;

        let transition = LikeTransition::between(currently_liked, liked);
        if transition != LikeTransition::Unchanged {
            sqlx::query(
                "UPDATE video_likes SET is_liked = ?, updated_at = ? WHERE user_id = ? AND video_id = ?",
            )
            .bind(liked)
            .bind(now)
            .bind(user_id)
            .bind(video_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO video_stats (video_id, views, likes, comments, hot_score, updated_at)
                VALUES (?, 0, GREATEST(?, 0), 0, 0, ?)
                ON DUPLICATE KEY UPDATE
                    likes = GREATEST(likes + ?, 0),
                    updated_at = VALUES(updated_at)
                "#,
            )
            .bind(video_id)
            .bind(transition.delta())
            .bind(now)
            .bind(transition.delta())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(transition)
    }

    async fn like_status(&self, user_id: i64, video_id: i64) -> RepoResult<bool> {
        let row = sqlx::query("SELECT is_liked FROM video_likes WHERE user_id = ? AND video_id = ?")
            .bind(user_id)
            .bind(video_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(row.try_get("is_liked")?),
            None => Ok(false),
        }
    }
}
