use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::{Client, IntoConnectionInfo};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

/// Shared Redis connection manager guarded by a Tokio mutex.
pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

/// Redis connection pool shared by every component of a service.
#[derive(Clone)]
pub struct RedisPool {
    manager: SharedConnectionManager,
}

impl RedisPool {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let info = redis_url
            .into_connection_info()
            .context("failed to parse REDIS_URL connection string")?;
        let client = Client::open(info).context("failed to construct Redis client")?;
        let connection_manager = ConnectionManager::new(client)
            .await
            .context("failed to initialize Redis connection manager")?;

        Ok(Self {
            manager: Arc::new(Mutex::new(connection_manager)),
        })
    }

    /// Connect, retrying with linear backoff while Redis comes up.
    pub async fn connect_with_retry(redis_url: &str, attempts: u32, backoff: Duration) -> Result<Self> {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            match Self::connect(redis_url).await {
                Ok(pool) => {
                    info!(attempt, "Redis connection established");
                    return Ok(pool);
                }
                Err(err) if attempt < attempts => {
                    warn!(attempt, error = %err, "Redis connection failed, retrying");
                    sleep(backoff * attempt).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(err).context(format!("Redis unavailable after {} attempts", attempts));
                }
            }
        }
    }

    pub fn manager(&self) -> SharedConnectionManager {
        self.manager.clone()
    }
}
