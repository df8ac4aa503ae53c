//! Supervised fire-and-forget work
//!
//! Cache maintenance that runs after a request has been answered (rank
//! refresh, like counter and flag updates) goes through [`TaskSupervisor`]:
//! every task is logged, counted, isolated from panics, and can be drained
//! on shutdown.

use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, warn};

use crate::metrics::background as metrics;

/// How a supervised task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed(String),
    Panicked(String),
}

impl TaskOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            TaskOutcome::Completed => "completed",
            TaskOutcome::Failed(_) => "failed",
            TaskOutcome::Panicked(_) => "panicked",
        }
    }
}

#[derive(Clone)]
pub struct TaskSupervisor {
    in_flight: Arc<watch::Sender<usize>>,
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskSupervisor {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0usize);
        Self {
            in_flight: Arc::new(tx),
        }
    }

    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Run `fut` on the runtime. The returned receiver resolves with the
    /// outcome; dropping it does not cancel the task.
    pub fn spawn<F, E>(&self, name: &'static str, fut: F) -> oneshot::Receiver<TaskOutcome>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let guard = InFlightGuard::enter(self.in_flight.clone());

        tokio::spawn(async move {
            let _guard = guard;
            let outcome = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(())) => {
                    debug!(task = name, "Background task completed");
                    TaskOutcome::Completed
                }
                Ok(Err(e)) => {
                    warn!(task = name, error = %e, "Background task failed");
                    TaskOutcome::Failed(e.to_string())
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(task = name, panic = %message, "Background task panicked");
                    TaskOutcome::Panicked(message)
                }
            };
            metrics::record_task_outcome(name, outcome.label());
            let _ = tx.send(outcome);
        });

        rx
    }

    /// Wait until no task is in flight. Returns `false` if `deadline` passed first.
    pub async fn drain(&self, deadline: Duration) -> bool {
        let mut rx = self.in_flight.subscribe();
        let drained = match tokio::time::timeout(deadline, rx.wait_for(|n| *n == 0)).await {
            Ok(Ok(_)) => true,
            // The sender lives in `self`, so the channel cannot close here.
            Ok(Err(_)) => true,
            Err(_) => {
                warn!(in_flight = self.in_flight(), "Timed out draining background tasks");
                false
            }
        };
        drained
    }
}

struct InFlightGuard {
    counter: Arc<watch::Sender<usize>>,
}

impl InFlightGuard {
    fn enter(counter: Arc<watch::Sender<usize>>) -> Self {
        counter.send_modify(|n| *n += 1);
        metrics::set_tasks_in_flight(*counter.borrow());
        Self { counter }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.send_modify(|n| *n = n.saturating_sub(1));
        metrics::set_tasks_in_flight(*self.counter.borrow());
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
