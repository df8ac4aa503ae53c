//! Video cache layer
//!
//! Cache-aside storage for the video read path:
//! - Profile cache with a refusal rule for empty profiles
//! - View/like counters seeded from the durable store and updated atomically
//! - Hot ranking sorted set
//! - Short-lived search/trending result pages (empty pages are never cached)
//! - SCAN-based key enumeration for view reconciliation (no blocking KEYS)
//!
//! [`CacheBackend`] is the raw command surface; [`VideoCache`] is the typed
//! facade services use. [`RedisCache`] backs production, [`InMemoryCache`]
//! backs tests and local runs.

mod error;
mod keys;
mod memory;
mod metrics;
mod redis_backend;
mod video;

pub use error::{CacheError, CacheResult};
pub use keys::{CacheKey, PREFIX};
pub use memory::InMemoryCache;
pub use metrics::CacheMetrics;
pub use redis_backend::RedisCache;
pub use video::VideoCache;

/// Default TTL values (seconds)
pub mod ttl {
    pub use video_core::constants::{LIKE_FLAG_TTL_SECS as LIKE_FLAG, PROFILE_TTL_SECS as PROFILE};
    pub use video_core::constants::SEARCH_TTL_SECS as SEARCH;
}

/// Raw cache commands used by the video components
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a string value
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Set a string value, with TTL when given
    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> CacheResult<()>;

    /// Set only if absent; returns whether the key was written
    async fn set_nx(&self, key: &str, value: &str) -> CacheResult<bool>;

    /// Delete a key
    async fn del(&self, key: &str) -> CacheResult<()>;

    /// Check if key exists
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Atomic increment (negative delta decrements); returns the new value
    async fn incr_by(&self, key: &str, delta: i64) -> CacheResult<i64>;

    /// Sorted-set insert-or-update
    async fn zadd(&self, key: &str, member: &str, score: f64) -> CacheResult<()>;

    /// Sorted-set members by descending score, inclusive rank range
    async fn zrevrange_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> CacheResult<Vec<(String, f64)>>;

    /// All keys matching a glob pattern
    async fn scan_match(&self, pattern: &str) -> CacheResult<Vec<String>>;

    /// Liveness probe
    async fn ping(&self) -> CacheResult<()>;
}
