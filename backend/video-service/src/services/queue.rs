//! Hand-off of uploaded videos to the processing pipeline

use std::time::Duration;

use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::KafkaConfig;
use crate::error::{AppError, Result};

/// Message published for every accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTask {
    pub video_id: i64,
    pub user_id: i64,
    /// Object key of the stored payload
    pub object: String,
}

#[async_trait::async_trait]
pub trait TaskPublisher: Send + Sync {
    async fn publish(&self, task: &UploadTask) -> Result<()>;
}

#[derive(Clone)]
pub struct KafkaTaskPublisher {
    producer: FutureProducer,
    topic: String,
    timeout: Duration,
}

impl KafkaTaskPublisher {
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("message.timeout.ms", "5000")
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("compression.type", "lz4")
            .create()
            .map_err(|e| AppError::QueueError(format!("kafka producer: {}", e)))?;

        Ok(Self {
            producer,
            topic: config.upload_topic.clone(),
            timeout: Duration::from_secs(5),
        })
    }
}

#[async_trait::async_trait]
impl TaskPublisher for KafkaTaskPublisher {
    async fn publish(&self, task: &UploadTask) -> Result<()> {
        let payload = serde_json::to_string(task)
            .map_err(|e| AppError::InternalError(format!("encode upload task: {}", e)))?;
        let key = task.video_id.to_string();
        let record = FutureRecord::to(&self.topic).payload(&payload).key(&key);

        debug!(topic = %self.topic, video_id = task.video_id, "Publishing upload task");

        match timeout(self.timeout, self.producer.send(record, self.timeout)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err((e, _))) => Err(AppError::QueueError(e.to_string())),
            Err(_) => {
                warn!("Kafka send timed out after {:?}", self.timeout);
                Err(AppError::QueueError("kafka publish timeout".into()))
            }
        }
    }
}

/// Publisher used when no broker is configured: tasks are logged and dropped.
#[derive(Debug, Clone, Default)]
pub struct NoopTaskPublisher;

#[async_trait::async_trait]
impl TaskPublisher for NoopTaskPublisher {
    async fn publish(&self, task: &UploadTask) -> Result<()> {
        debug!(video_id = task.video_id, object = %task.object, "No queue configured, dropping upload task");
        Ok(())
    }
}
