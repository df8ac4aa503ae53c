use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis_utils::SharedConnectionManager;
use tracing::debug;

use crate::{CacheBackend, CacheError, CacheResult};

/// Redis-backed cache
#[derive(Clone)]
pub struct RedisCache {
    redis: SharedConnectionManager,
}

impl RedisCache {
    pub fn new(redis: SharedConnectionManager) -> Self {
        Self { redis }
    }

    /// Add jitter to TTL to prevent thundering herd
    fn add_jitter(ttl_secs: u64) -> u64 {
        let jitter_percent = (rand::random::<u32>() % 10) as f64 / 100.0;
        let jitter = (ttl_secs as f64 * jitter_percent).round() as u64;
        ttl_secs + jitter
    }

    // ConnectionManager is a cheap multiplexed handle; clone it out of the
    // lock so concurrent callers do not serialize on the mutex.
    async fn conn(&self) -> ConnectionManager {
        self.redis.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn().await;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> CacheResult<()> {
        let mut conn = self.conn().await;
        match ttl_secs {
            Some(ttl) => {
                let ttl_with_jitter = Self::add_jitter(ttl);
                conn.set_ex::<_, _, ()>(key, value, ttl_with_jitter).await?;
                debug!(key = %key, ttl = ttl_with_jitter, "Cache set");
            }
            None => {
                conn.set::<_, _, ()>(key, value).await?;
                debug!(key = %key, "Cache set (no ttl)");
            }
        }
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str) -> CacheResult<bool> {
        let mut conn = self.conn().await;
        let written: bool = conn.set_nx(key, value).await?;
        Ok(written)
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn().await;
        conn.del::<_, ()>(key).await?;
        debug!(key = %key, "Cache delete");
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.conn().await;
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn incr_by(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let mut conn = self.conn().await;
        let value: i64 = conn.incr(key, delta).await?;
        Ok(value)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> CacheResult<()> {
        let mut conn = self.conn().await;
        conn.zadd::<_, _, _, ()>(key, member, score).await?;
        Ok(())
    }

    async fn zrevrange_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> CacheResult<Vec<(String, f64)>> {
        let mut conn = self.conn().await;
        let members: Vec<(String, f64)> = conn.zrevrange_withscores(key, start, stop).await?;
        Ok(members)
    }

    async fn scan_match(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.conn().await;
        let mut cursor: u64 = 0;
        let mut found = Vec::new();

        loop {
            // Use SCAN instead of KEYS to avoid blocking
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(CacheError::Redis)?;

            found.extend(keys);

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        // SCAN may return a key more than once across iterations.
        found.sort_unstable();
        found.dedup();

        debug!(pattern = %pattern, count = found.len(), "Cache scan");
        Ok(found)
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn().await;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(CacheError::Redis)?;
        Ok(())
    }
}
