//! Metrics for supervised tasks and view reconciliation

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Histogram, IntCounterVec,
    IntGauge,
};
use std::time::Duration;

/// Supervised background tasks by name and outcome (completed/failed/panicked)
static BACKGROUND_TASKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "video_background_tasks_total",
        "Supervised background tasks by outcome",
        &["task", "outcome"]
    )
    .expect("failed to register video_background_tasks_total")
});

static BACKGROUND_TASKS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "video_background_tasks_in_flight",
        "Supervised background tasks currently running"
    )
    .expect("failed to register video_background_tasks_in_flight")
});

/// View counters visited by reconciliation (updated/skipped/failed)
static VIEWS_RECONCILED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "video_views_reconciled_total",
        "View counters visited by reconciliation",
        &["result"]
    )
    .expect("failed to register video_views_reconciled_total")
});

static RECONCILE_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "video_views_reconcile_duration_seconds",
        "Duration of a view reconciliation pass",
        vec![0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("failed to register video_views_reconcile_duration_seconds")
});

pub fn record_task_outcome(task: &str, outcome: &str) {
    BACKGROUND_TASKS_TOTAL
        .with_label_values(&[task, outcome])
        .inc();
}

pub fn set_tasks_in_flight(count: usize) {
    BACKGROUND_TASKS_IN_FLIGHT.set(count as i64);
}

pub fn record_reconciled(result: &str, count: u64) {
    VIEWS_RECONCILED_TOTAL
        .with_label_values(&[result])
        .inc_by(count);
}

pub fn record_reconcile_duration(duration: Duration) {
    RECONCILE_DURATION_SECONDS.observe(duration.as_secs_f64());
}
