//! Application state management

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::app::options::{AppOptions, PublisherOptions};
use crate::authz::projects::{ProjectDirectory, StaticProjectDirectory};
use crate::deploy::executor::{PipelineExecutor, PipelineSettings};
use crate::deploy::publish::{HttpPublisher, Publisher, SimulatedPublisher};
use crate::errors::DeployError;
use crate::services::deployments::DeploymentService;
use crate::storage::store::DeploymentStore;
use crate::telemetry::{MetricsReporter, SyntheticTelemetry, TelemetrySource};
use crate::workers::pool::PipelinePool;

/// Main application state.
///
/// The single context handle passed to everything that needs the orchestrator.
pub struct AppState {
    /// Deployment orchestration service
    pub deployments: Arc<DeploymentService>,

    /// Project ownership lookup
    pub projects: Arc<dyn ProjectDirectory>,
}

impl AppState {
    /// Initialize application state from options
    pub fn init(options: &AppOptions) -> Result<Self, DeployError> {
        info!("Initializing application state...");

        let publisher: Arc<dyn Publisher> = match &options.publisher {
            PublisherOptions::Simulated => Arc::new(SimulatedPublisher),
            PublisherOptions::Http { base_url, timeout } => {
                info!("Using publish backend at {}", base_url);
                Arc::new(HttpPublisher::new(base_url, *timeout)?)
            }
        };

        Ok(Self::with_collaborators(
            options.pipeline.clone(),
            publisher,
            Arc::new(SyntheticTelemetry),
            Arc::new(StaticProjectDirectory::new(options.projects.clone())),
        ))
    }

    /// Assemble state around explicit collaborators
    pub fn with_collaborators(
        pipeline: PipelineSettings,
        publisher: Arc<dyn Publisher>,
        telemetry: Arc<dyn TelemetrySource>,
        projects: Arc<dyn ProjectDirectory>,
    ) -> Self {
        let deployments = DeploymentService::new(
            Arc::new(DeploymentStore::new()),
            Arc::new(PipelineExecutor::new(publisher, pipeline)),
            Arc::new(PipelinePool::new()),
            Arc::new(MetricsReporter::new(telemetry)),
        );

        Self {
            deployments: Arc::new(deployments),
            projects,
        }
    }

    /// Shutdown application state
    pub async fn shutdown(&self, pipeline_grace: Duration) -> Result<(), DeployError> {
        info!("Shutting down application state...");
        self.deployments.shutdown(pipeline_grace).await;
        Ok(())
    }
}
