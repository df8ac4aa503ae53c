//! TaskPublisher that keeps published tasks in memory

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use video_service::services::{TaskPublisher, UploadTask};
use video_service::{AppError, Result};

#[derive(Clone, Default)]
pub struct MockTaskPublisher {
    tasks: Arc<Mutex<Vec<UploadTask>>>,
    failing: Arc<AtomicBool>,
}

impl MockTaskPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<UploadTask> {
        self.tasks.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TaskPublisher for MockTaskPublisher {
    async fn publish(&self, task: &UploadTask) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::QueueError("broker down".into()));
        }
        self.tasks.lock().unwrap().push(task.clone());
        Ok(())
    }
}
