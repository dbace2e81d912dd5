//! Deployment orchestration service
//!
//! Synchronous-facing operations over deployment records. `start` and
//! `rollback` hand the pipeline to the [`PipelinePool`] and return at once;
//! everything else reads or mutates records under their own locks.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::deploy::executor::PipelineExecutor;
use crate::deploy::fsm::{self, DeploymentEvent, Transition};
use crate::errors::DeployError;
use crate::models::deployment::{
    DeploymentConfig, DeploymentRecord, DeploymentStatus, LogEntry,
};
use crate::models::metrics::{MetricsReport, TimeRange};
use crate::storage::log_sink;
use crate::storage::store::{read_record, write_record, DeploymentStore, RecordHandle};
use crate::telemetry::MetricsReporter;
use crate::workers::pool::PipelinePool;

/// Deployment orchestration service
pub struct DeploymentService {
    store: Arc<DeploymentStore>,
    executor: Arc<PipelineExecutor>,
    pool: Arc<PipelinePool>,
    reporter: Arc<MetricsReporter>,
}

impl DeploymentService {
    /// Create a new service
    pub fn new(
        store: Arc<DeploymentStore>,
        executor: Arc<PipelineExecutor>,
        pool: Arc<PipelinePool>,
        reporter: Arc<MetricsReporter>,
    ) -> Self {
        Self {
            store,
            executor,
            pool,
            reporter,
        }
    }

    /// Underlying record store
    pub fn store(&self) -> &Arc<DeploymentStore> {
        &self.store
    }

    /// Validate the request, create a pending record and launch its pipeline.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        &self,
        project_id: &str,
        platform: &str,
        configuration: Map<String, Value>,
    ) -> Result<DeploymentRecord, DeployError> {
        let config = DeploymentConfig::parse(platform, configuration)?;
        self.pool.ensure_open()?;

        let record = DeploymentRecord::new(project_id, config);
        info!(
            deployment_id = %record.id,
            %project_id,
            platform = %record.platform,
            "deployment created"
        );
        self.launch(record)
    }

    /// Most recently created record of the project
    pub fn get_status(&self, project_id: &str) -> Option<DeploymentRecord> {
        self.store
            .latest(project_id)
            .map(|handle| read_record(&handle).clone())
    }

    /// Logs of a deployment, or of the most recent one when `deployment_id` is omitted
    pub fn get_logs(&self, project_id: &str, deployment_id: Option<&str>) -> Vec<LogEntry> {
        let handle = match deployment_id {
            Some(id) => self.store.get_for_project(project_id, id),
            None => self.store.latest(project_id),
        };

        handle
            .map(|handle| log_sink::entries(&read_record(&handle)))
            .unwrap_or_default()
    }

    /// Cancel a pending or building deployment.
    ///
    /// Cancelling a finished deployment is a no-op. Returns the record as it
    /// stands afterwards.
    pub fn cancel(
        &self,
        project_id: &str,
        deployment_id: &str,
    ) -> Result<DeploymentRecord, DeployError> {
        let handle = self.find(project_id, deployment_id)?;
        let mut record = write_record(&handle);

        match fsm::process(&mut record, DeploymentEvent::Cancel)? {
            Transition::Applied { from, .. } => {
                log_sink::append(&mut record, LogEntry::warn("Deployment cancelled"));
                info!(%deployment_id, %project_id, %from, "deployment cancelled");
            }
            Transition::Unchanged => {
                debug!(
                    %deployment_id,
                    status = %record.status,
                    "cancel ignored for finished deployment"
                );
            }
        }

        Ok(record.clone())
    }

    /// Redeploy the platform and configuration of a successful deployment.
    ///
    /// Must be called from within a tokio runtime.
    pub fn rollback(
        &self,
        project_id: &str,
        target_deployment_id: &str,
    ) -> Result<DeploymentRecord, DeployError> {
        let target = self.find(project_id, target_deployment_id)?;

        let record = {
            let target = read_record(&target);
            if target.status != DeploymentStatus::Success {
                return Err(DeployError::InvalidState(
                    "Can only rollback to successful deployments".to_string(),
                ));
            }
            DeploymentRecord::rollback_of(&target)
        };
        self.pool.ensure_open()?;

        info!(
            deployment_id = %record.id,
            %project_id,
            rollback_from = %target_deployment_id,
            "rollback deployment created"
        );
        self.launch(record)
    }

    /// Up to `limit` most recent records of the project, newest first
    pub fn get_history(&self, project_id: &str, limit: usize) -> Vec<DeploymentRecord> {
        self.store.history(project_id, limit)
    }

    /// Metrics of the project's most recent successful deployment
    pub async fn get_metrics(
        &self,
        project_id: &str,
        range: TimeRange,
    ) -> Result<MetricsReport, DeployError> {
        let live = self
            .store
            .latest_with_status(project_id, DeploymentStatus::Success)
            .ok_or_else(|| {
                DeployError::NotFound(format!(
                    "No live deployment for project: {}",
                    project_id
                ))
            })?;

        self.reporter.report(&live, range).await
    }

    /// Stop accepting deployments and wait up to `grace` for running pipelines
    pub async fn shutdown(&self, grace: Duration) {
        self.pool.drain(grace).await;
    }

    fn find(&self, project_id: &str, deployment_id: &str) -> Result<RecordHandle, DeployError> {
        self.store
            .get_for_project(project_id, deployment_id)
            .ok_or_else(|| {
                DeployError::NotFound(format!("Deployment not found: {}", deployment_id))
            })
    }

    /// Spawn the pipeline of `record`, then store it; returns the pending snapshot.
    ///
    /// A record is only stored once the pool accepted its pipeline.
    fn launch(&self, record: DeploymentRecord) -> Result<DeploymentRecord, DeployError> {
        let snapshot = record.clone();
        let handle: RecordHandle = Arc::new(RwLock::new(record));

        let executor = self.executor.clone();
        let task_handle = handle.clone();
        self.pool.spawn(async move {
            executor.run(task_handle).await;
        })?;

        self.store.insert_handle(handle);
        Ok(snapshot)
    }
}
