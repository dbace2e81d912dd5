//! Supervised pool of pipeline tasks
//!
//! Every executor run is spawned here instead of being detached, so shutdown
//! can wait for in-flight pipelines. Execution is at-most-once: a pipeline
//! aborted at shutdown leaves its record in a non-terminal state.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

use crate::errors::DeployError;

/// Pipeline task pool
pub struct PipelinePool {
    inner: Mutex<PoolInner>,
}

#[derive(Default)]
struct PoolInner {
    tasks: JoinSet<()>,
    closed: bool,
}

impl PipelinePool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PoolInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fail when the pool no longer accepts work
    pub fn ensure_open(&self) -> Result<(), DeployError> {
        if self.lock().closed {
            return Err(closed_error());
        }
        Ok(())
    }

    /// Spawn a pipeline task. Must be called from within a tokio runtime.
    ///
    /// Fails once [`drain`](Self::drain) has started; the task is then dropped unpolled.
    pub fn spawn<F>(&self, task: F) -> Result<(), DeployError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut inner = self.lock();
        if inner.closed {
            return Err(closed_error());
        }

        // Reap tasks that already finished so the set does not grow unbounded
        while let Some(result) = inner.tasks.try_join_next() {
            log_join_result(result);
        }

        inner.tasks.spawn(task);
        Ok(())
    }

    /// Number of pipeline tasks not yet reaped
    pub fn active_count(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Stop accepting work and wait up to `grace` for running pipelines.
    ///
    /// Pipelines still running after `grace` are aborted.
    pub async fn drain(&self, grace: Duration) {
        let mut tasks = {
            let mut inner = self.lock();
            inner.closed = true;
            std::mem::take(&mut inner.tasks)
        };

        if tasks.is_empty() {
            return;
        }

        info!("Waiting for {} deployment pipeline(s) to finish...", tasks.len());

        let drained = tokio::time::timeout(grace, async {
            while let Some(result) = tasks.join_next().await {
                log_join_result(result);
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                "{} deployment pipeline(s) still running after {:?}, aborting; their records stay non-terminal",
                tasks.len(),
                grace
            );
            tasks.shutdown().await;
        }
    }
}

impl Default for PipelinePool {
    fn default() -> Self {
        Self::new()
    }
}

fn closed_error() -> DeployError {
    DeployError::Shutdown("deployment pipelines are shutting down".to_string())
}

fn log_join_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!("Deployment pipeline task panicked: {}", e);
        }
    }
}
