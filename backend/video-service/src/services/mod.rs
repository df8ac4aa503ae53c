//! Business logic layer
//!
//! [`Services::build`] wires the components against their collaborators; the
//! binary and the integration tests share it.

pub mod likes;
pub mod profiles;
pub mod queue;
pub mod ranking;
pub mod storage;
pub mod video;
pub mod views;

use std::sync::Arc;

use snowflake_id::Snowflake;
use video_cache::VideoCache;
use video_core::HotScorer;

use crate::repository::VideoRepository;
use crate::tasks::TaskSupervisor;

pub use likes::{LikeService, LikeUpdate};
pub use profiles::ProfileReader;
pub use queue::{KafkaTaskPublisher, NoopTaskPublisher, TaskPublisher, UploadTask};
pub use ranking::{HotScoreRefresher, RankingEngine};
pub use storage::{BlobStore, S3BlobStore};
pub use video::{SubmitVideo, SubmittedVideo, VideoService};
pub use views::{AggregatorHandle, ReconcileReport, ShutdownError, ViewAggregator};

/// External collaborators the services are built on.
pub struct ServiceDeps {
    pub cache: VideoCache,
    pub repo: Arc<dyn VideoRepository>,
    pub ids: Arc<Snowflake>,
    pub blobs: Arc<dyn BlobStore>,
    pub publisher: Arc<dyn TaskPublisher>,
    pub scorer: HotScorer,
}

#[derive(Clone)]
pub struct Services {
    pub videos: Arc<VideoService>,
    pub likes: Arc<LikeService>,
    pub ranking: Arc<RankingEngine>,
    pub views: Arc<ViewAggregator>,
    pub cache: VideoCache,
    pub tasks: TaskSupervisor,
}

impl Services {
    pub fn build(deps: ServiceDeps) -> Self {
        let tasks = TaskSupervisor::new();
        let profiles = ProfileReader::new(deps.cache.clone(), deps.repo.clone());

        let ranking = Arc::new(RankingEngine::new(
            deps.cache.clone(),
            deps.repo.clone(),
            profiles.clone(),
            deps.scorer,
        ));
        let refresher: Arc<dyn HotScoreRefresher> = ranking.clone();

        let views = Arc::new(ViewAggregator::new(
            deps.cache.clone(),
            deps.repo.clone(),
            refresher.clone(),
            tasks.clone(),
        ));

        let likes = Arc::new(LikeService::new(
            deps.cache.clone(),
            deps.repo.clone(),
            profiles.clone(),
            refresher,
            tasks.clone(),
        ));

        let videos = Arc::new(VideoService::new(
            deps.cache.clone(),
            deps.repo,
            profiles,
            ranking.clone(),
            views.clone(),
            deps.ids,
            deps.blobs,
            deps.publisher,
            tasks.clone(),
        ));

        Self {
            videos,
            likes,
            ranking,
            views,
            cache: deps.cache,
            tasks,
        }
    }
}
