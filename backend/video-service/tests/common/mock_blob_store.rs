//! In-memory BlobStore that records uploads

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use video_service::services::BlobStore;
use video_service::{AppError, Result};

#[derive(Clone, Default)]
pub struct MockBlobStore {
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
    failing: Arc<AtomicBool>,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl BlobStore for MockBlobStore {
    async fn put_object(&self, key: &str, body: Bytes, _content_type: &str) -> Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::StorageError("minio unreachable".into()));
        }
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(format!("http://minio.test/video/{}", key))
    }
}
