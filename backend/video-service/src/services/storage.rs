//! Object storage for uploaded video payloads (S3 / MinIO)

use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::{debug, error};

use crate::config::S3Config;
use crate::error::{AppError, Result};

#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `body` under `key` and return the URL clients fetch it from.
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3BlobStore {
    pub async fn new(config: &S3Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "video_service_s3",
            );
            loader = loader.credentials_provider(credentials);
        }

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let shared = loader.load().await;
        // MinIO serves buckets by path, not by virtual host.
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.endpoint.is_some())
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }

    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

#[async_trait::async_trait]
impl BlobStore for S3BlobStore {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<String> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                error!(bucket = %self.bucket, key = %key, error = %e, "S3 upload failed");
                AppError::StorageError(format!("upload of {} failed: {}", key, e))
            })?;

        debug!(bucket = %self.bucket, key = %key, size, "Uploaded object");
        Ok(self.object_url(key))
    }
}
