//! Cache error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Refused to cache: {0}")]
    Refused(&'static str),

    #[error("Invalid cache data: {0}")]
    InvalidData(String),
}

impl CacheError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::Redis(_) => "redis",
            CacheError::Serialization(_) => "serialization",
            CacheError::Refused(_) => "refused",
            CacheError::InvalidData(_) => "invalid_data",
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
