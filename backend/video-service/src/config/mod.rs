//! Configuration management for Video Service
//!
//! Loads configuration from environment variables (a `.env` file is honoured
//! by `main` through `dotenv`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use video_core::constants::{
    DEFAULT_HOT_DECAY_SECS, DEFAULT_NEW_VIDEO_OFFSET, VIDEO_SERVICE_WORKER_ID,
    VIEW_SYNC_INTERVAL_SECS,
};
use video_core::HotScorer;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub snowflake: SnowflakeConfig,
    pub ranking: RankingConfig,
    pub views: ViewSyncConfig,
    pub s3: S3Config,
    /// `None` when `KAFKA_BROKERS` is unset; upload tasks are then dropped
    pub kafka: Option<KafkaConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub host: String,
    pub port: u16,
    /// `json` or `text`
    pub log_format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub connect_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnowflakeConfig {
    pub datacenter_id: i64,
    pub worker_id: i64,
    /// Largest backward clock step absorbed by waiting
    pub max_backward_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    pub decay_seconds: f64,
    pub new_video_offset: f64,
}

impl RankingConfig {
    pub fn scorer(&self) -> HotScorer {
        HotScorer::new(self.decay_seconds, self.new_video_offset)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewSyncConfig {
    pub interval_secs: u64,
    pub shutdown_timeout_secs: u64,
}

impl ViewSyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible storage (MinIO)
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Base URL clients use to fetch objects; defaults to `{endpoint}/{bucket}`
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    pub brokers: String,
    pub upload_topic: String,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: env_or("APP_ENV", "development"),
            host: env_or("APP_HOST", "0.0.0.0"),
            port: parse_env("APP_PORT", 8080)?,
            log_format: env_or("LOG_FORMAT", "text"),
        };

        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: parse_env("DB_MAX_CONNECTIONS", 20)?,
            min_connections: parse_env("DB_MIN_CONNECTIONS", 5)?,
            run_migrations: parse_env("RUN_MIGRATIONS", true)?,
        };

        let redis = RedisConfig {
            url: env_or("REDIS_URL", "redis://127.0.0.1:6379"),
            connect_attempts: parse_env("REDIS_CONNECT_ATTEMPTS", 5)?,
        };

        let snowflake = SnowflakeConfig {
            datacenter_id: parse_env("SNOWFLAKE_DATACENTER_ID", 0)?,
            worker_id: parse_env("SNOWFLAKE_WORKER_ID", VIDEO_SERVICE_WORKER_ID)?,
            max_backward_ms: parse_env(
                "SNOWFLAKE_MAX_BACKWARD_MS",
                snowflake_id::DEFAULT_MAX_BACKWARD_MS,
            )?,
        };

        let ranking = RankingConfig {
            decay_seconds: parse_env("HOT_DECAY_SECONDS", DEFAULT_HOT_DECAY_SECS)?,
            new_video_offset: parse_env("HOT_NEW_VIDEO_OFFSET", DEFAULT_NEW_VIDEO_OFFSET)?,
        };

        let views = ViewSyncConfig {
            interval_secs: parse_env("VIEW_SYNC_INTERVAL_SECS", VIEW_SYNC_INTERVAL_SECS)?,
            shutdown_timeout_secs: parse_env("SHUTDOWN_FLUSH_TIMEOUT_SECS", 30)?,
        };

        let endpoint = std::env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty());
        let bucket = env_or("S3_BUCKET", "video");
        let public_base_url = match std::env::var("S3_PUBLIC_BASE_URL") {
            Ok(url) => url,
            Err(_) => format!(
                "{}/{}",
                endpoint
                    .as_deref()
                    .unwrap_or("http://127.0.0.1:9000")
                    .trim_end_matches('/'),
                bucket
            ),
        };
        let s3 = S3Config {
            bucket,
            region: env_or("S3_REGION", "us-east-1"),
            endpoint,
            access_key_id: std::env::var("S3_ACCESS_KEY_ID").ok(),
            secret_access_key: std::env::var("S3_SECRET_ACCESS_KEY").ok(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        };

        let kafka = std::env::var("KAFKA_BROKERS")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|brokers| KafkaConfig {
                brokers,
                upload_topic: env_or("KAFKA_UPLOAD_TOPIC", "video-upload"),
            });

        Ok(Config {
            app,
            database,
            redis,
            snowflake,
            ranking,
            views,
            s3,
            kafka,
        })
    }

    pub fn db_pool_config(&self) -> db_pool::DbConfig {
        db_pool::DbConfig {
            service_name: "video-service".to_string(),
            database_url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            min_connections: self.database.min_connections,
            ..db_pool::DbConfig::default()
        }
    }
}
