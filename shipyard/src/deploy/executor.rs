//! Pipeline executor
//!
//! Drives one deployment record through [`PipelineStep::ALL`]. Cancellation is
//! cooperative: the record status is checked at every step boundary, and a
//! terminal status reached in the meantime (a cancel) makes the executor stop
//! and discard whatever it produced.

use std::sync::Arc;
use std::time::Duration;

use publish_api::models::{Artifact, PublishResponse};
use tracing::{debug, error, info, warn};

use crate::deploy::fsm::{self, DeploymentEvent};
use crate::deploy::pipeline::PipelineStep;
use crate::deploy::publish::Publisher;
use crate::errors::DeployError;
use crate::models::deployment::{DeploymentConfig, DeploymentStatus, LogEntry};
use crate::storage::log_sink;
use crate::storage::store::{read_record, write_record, RecordHandle};

/// Pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Simulated work duration of each step
    pub step_delay: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(1500),
        }
    }
}

/// Immutable inputs of one pipeline run
struct RunContext {
    deployment_id: String,
    project_id: String,
    config: DeploymentConfig,
}

/// Pipeline executor
pub struct PipelineExecutor {
    publisher: Arc<dyn Publisher>,
    settings: PipelineSettings,
}

impl PipelineExecutor {
    /// Create a new executor
    pub fn new(publisher: Arc<dyn Publisher>, settings: PipelineSettings) -> Self {
        Self {
            publisher,
            settings,
        }
    }

    /// Run the pipeline for `record` and return the status it ended in.
    ///
    /// Must be invoked exactly once per record.
    pub async fn run(&self, record: RecordHandle) -> DeploymentStatus {
        let ctx = {
            let r = read_record(&record);
            RunContext {
                deployment_id: r.id.clone(),
                project_id: r.project_id.clone(),
                config: r.config(),
            }
        };

        info!(
            deployment_id = %ctx.deployment_id,
            project_id = %ctx.project_id,
            platform = %ctx.config.platform,
            "starting deployment pipeline"
        );

        let mut published: Option<PublishResponse> = None;

        for step in PipelineStep::ALL {
            if let Some(status) = self.enter_step(&record, &ctx, step) {
                info!(
                    deployment_id = %ctx.deployment_id,
                    step = %step,
                    %status,
                    "pipeline halted"
                );
                return status;
            }

            match self.perform(&ctx, step).await {
                Ok(Some(response)) => published = Some(response),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        deployment_id = %ctx.deployment_id,
                        step = %step,
                        "pipeline step failed: {}",
                        e
                    );
                    return self.finish(&record, &ctx, DeploymentEvent::Fail(e.to_string()));
                }
            }

            debug!(deployment_id = %ctx.deployment_id, step = %step, "step completed");
        }

        let event = match published {
            Some(response) => DeploymentEvent::Succeed {
                url: response.url,
                preview_url: response.preview_url,
            },
            None => DeploymentEvent::Fail("publish step produced no result".to_string()),
        };
        self.finish(&record, &ctx, event)
    }

    /// Check the step boundary and announce the step.
    ///
    /// Returns the record status when the pipeline must halt.
    fn enter_step(
        &self,
        record: &RecordHandle,
        ctx: &RunContext,
        step: PipelineStep,
    ) -> Option<DeploymentStatus> {
        let mut r = write_record(record);

        if r.status.is_terminal() {
            return Some(r.status);
        }

        if r.status == DeploymentStatus::Pending {
            if let Err(e) = fsm::process(&mut r, DeploymentEvent::Begin) {
                error!(deployment_id = %ctx.deployment_id, "cannot begin pipeline: {}", e);
                return Some(r.status);
            }
        }

        log_sink::append(&mut r, LogEntry::info(step.describe(&ctx.config)));
        None
    }

    async fn perform(
        &self,
        ctx: &RunContext,
        step: PipelineStep,
    ) -> Result<Option<PublishResponse>, DeployError> {
        tokio::time::sleep(self.settings.step_delay).await;

        if step != PipelineStep::Publish {
            return Ok(None);
        }

        let artifact = Artifact {
            deployment_id: ctx.deployment_id.clone(),
            output_directory: ctx.config.output_directory().to_string(),
        };
        let response = self
            .publisher
            .publish(&ctx.project_id, &ctx.config, &artifact)
            .await?;
        Ok(Some(response))
    }

    /// Apply the terminal event unless the record already reached a terminal state
    fn finish(
        &self,
        record: &RecordHandle,
        ctx: &RunContext,
        event: DeploymentEvent,
    ) -> DeploymentStatus {
        let mut r = write_record(record);

        if r.status.is_terminal() {
            debug!(
                deployment_id = %ctx.deployment_id,
                status = %r.status,
                "discarding pipeline outcome of finished deployment"
            );
            return r.status;
        }

        let entry = match &event {
            DeploymentEvent::Fail(cause) => LogEntry::error(format!("Deployment failed: {}", cause)),
            _ => LogEntry::info("Deployment completed successfully"),
        };

        match fsm::process(&mut r, event) {
            Ok(_) => {
                log_sink::append(&mut r, entry);
                info!(
                    deployment_id = %ctx.deployment_id,
                    status = %r.status,
                    "deployment pipeline finished"
                );
            }
            Err(e) => {
                error!(deployment_id = %ctx.deployment_id, "cannot finish pipeline: {}", e);
            }
        }

        r.status
    }
}
