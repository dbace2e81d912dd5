//! Server state

use std::sync::Arc;

use crate::authz::projects::ProjectDirectory;
use crate::services::deployments::DeploymentService;

/// Server state shared across handlers
pub struct ServerState {
    pub deployments: Arc<DeploymentService>,
    pub projects: Arc<dyn ProjectDirectory>,
}

impl ServerState {
    pub fn new(deployments: Arc<DeploymentService>, projects: Arc<dyn ProjectDirectory>) -> Self {
        Self {
            deployments,
            projects,
        }
    }
}
