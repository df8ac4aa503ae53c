//! View counting and reconciliation
//!
//! Views are counted in the cache only. A periodic pass copies every cached
//! counter into the durable `views` column, and one last pass runs on
//! shutdown.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use video_cache::{CacheError, CacheKey, CacheResult, VideoCache};
use video_core::VideoProfile;

use super::ranking::HotScoreRefresher;
use crate::metrics::background as metrics;
use crate::repository::VideoRepository;
use crate::tasks::TaskSupervisor;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Counter keys found by the scan
    pub scanned: u64,
    /// Counters written to the store
    pub updated: u64,
    /// Unchanged since the last pass, unreadable, or failed to write
    pub skipped: u64,
}

#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("final reconciliation did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("final reconciliation failed: {0}")]
    Cache(#[from] CacheError),
}

pub struct ViewAggregator {
    cache: VideoCache,
    repo: Arc<dyn VideoRepository>,
    refresher: Arc<dyn HotScoreRefresher>,
    tasks: TaskSupervisor,
    /// Last value written per live counter, so unchanged counters are not
    /// rewritten. Pruned to the keys seen by the latest scan.
    flushed: DashMap<i64, i64>,
}

impl ViewAggregator {
    pub fn new(
        cache: VideoCache,
        repo: Arc<dyn VideoRepository>,
        refresher: Arc<dyn HotScoreRefresher>,
        tasks: TaskSupervisor,
    ) -> Self {
        Self {
            cache,
            repo,
            refresher,
            tasks,
            flushed: DashMap::new(),
        }
    }

    /// Count one view of `profile` and schedule a hot score refresh.
    ///
    /// The counter starts from the durable view count when it is not cached.
    pub async fn record_view(&self, profile: &VideoProfile) -> CacheResult<i64> {
        let video_id = profile.video_id;
        let views = self.cache.incr_views(video_id, profile.views).await?;

        let refresher = self.refresher.clone();
        self.tasks.spawn("hot_score_refresh", async move {
            refresher.refresh(video_id).await.map(|_| ())
        });

        Ok(views)
    }

    /// Copy every cached view counter into the durable store.
    ///
    /// Failure on one key never aborts the pass. Only a failed scan does.
    pub async fn reconcile(&self) -> Result<ReconcileReport, CacheError> {
        let started = Instant::now();
        let keys = self.cache.scan_view_counters().await?;
        let mut report = ReconcileReport {
            scanned: keys.len() as u64,
            ..Default::default()
        };
        let mut failed = 0u64;
        let mut live = HashSet::with_capacity(keys.len());

        for key in keys {
            let Some(video_id) = CacheKey::parse_views_key(&key) else {
                warn!(key = %key, "Skipping malformed view counter key");
                report.skipped += 1;
                continue;
            };

            let views = match self.cache.views_by_key(&key).await {
                Ok(Some(views)) => views,
                // Expired or deleted between scan and read.
                Ok(None) => {
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to read view counter");
                    report.skipped += 1;
                    failed += 1;
                    continue;
                }
            };

            live.insert(video_id);
            if self.flushed.get(&video_id).map(|v| *v) == Some(views) {
                report.skipped += 1;
                continue;
            }

            match self.repo.update_views(video_id, views).await {
                Ok(()) => {
                    self.flushed.insert(video_id, views);
                    report.updated += 1;
                }
                Err(e) => {
                    warn!(video_id, error = %e, "Failed to persist view count");
                    report.skipped += 1;
                    failed += 1;
                }
            }
        }

        // Counters that expired no longer need a last-written value.
        self.flushed.retain(|video_id, _| live.contains(video_id));

        metrics::record_reconciled("updated", report.updated);
        metrics::record_reconciled("skipped", report.skipped - failed);
        metrics::record_reconciled("failed", failed);
        metrics::record_reconcile_duration(started.elapsed());

        debug!(
            scanned = report.scanned,
            updated = report.updated,
            skipped = report.skipped,
            duration_ms = started.elapsed().as_millis() as u64,
            "View reconciliation pass finished"
        );
        Ok(report)
    }

    /// Run [`reconcile`](Self::reconcile) every `interval` until shut down.
    pub fn start(self: Arc<Self>, interval: Duration) -> AggregatorHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let aggregator = self.clone();

        info!(interval_secs = interval.as_secs(), "Starting view reconciliation");

        let ticker = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        if let Err(e) = aggregator.reconcile().await {
                            error!(error = %e, "View reconciliation pass failed");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("View reconciliation ticker stopped");
                        break;
                    }
                }
            }
        });

        AggregatorHandle {
            aggregator: self,
            shutdown_tx,
            ticker,
        }
    }
}

/// Lifecycle handle returned by [`ViewAggregator::start`].
pub struct AggregatorHandle {
    aggregator: Arc<ViewAggregator>,
    shutdown_tx: watch::Sender<bool>,
    ticker: JoinHandle<()>,
}

impl AggregatorHandle {
    /// Stop the ticker, let in-flight refreshes settle, then run the final
    /// reconciliation. Everything is bounded by `deadline`.
    pub async fn shutdown(self, deadline: Duration) -> Result<ReconcileReport, ShutdownError> {
        let started = Instant::now();
        let AggregatorHandle {
            aggregator,
            shutdown_tx,
            ticker,
        } = self;
        let _ = shutdown_tx.send(true);

        let flush = async move {
            // A pass already in progress finishes before the ticker exits.
            if let Err(e) = ticker.await {
                warn!(error = %e, "View reconciliation ticker ended abnormally");
            }
            let remaining = deadline.saturating_sub(started.elapsed());
            if !aggregator.tasks.drain(remaining).await {
                warn!("Flushing views with background tasks still running");
            }
            aggregator.reconcile().await
        };

        let report = tokio::time::timeout(deadline, flush)
            .await
            .map_err(|_| ShutdownError::TimedOut(deadline))??;

        info!(
            updated = report.updated,
            skipped = report.skipped,
            "Final view reconciliation completed"
        );
        Ok(report)
    }
}
