//! Project ownership lookup

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::DeployError;

/// Resolves the owner of a project
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    /// Owner id of `project_id`, or [`DeployError::NotFound`]
    async fn resolve_project_owner(&self, project_id: &str) -> Result<String, DeployError>;
}

/// Project directory backed by a fixed project → owner map
#[derive(Debug, Clone, Default)]
pub struct StaticProjectDirectory {
    owners: HashMap<String, String>,
}

impl StaticProjectDirectory {
    pub fn new(owners: HashMap<String, String>) -> Self {
        Self { owners }
    }
}

#[async_trait]
impl ProjectDirectory for StaticProjectDirectory {
    async fn resolve_project_owner(&self, project_id: &str) -> Result<String, DeployError> {
        self.owners
            .get(project_id)
            .cloned()
            .ok_or_else(|| DeployError::NotFound(format!("Project not found: {}", project_id)))
    }
}

/// Check that `caller_id` owns `project_id`
pub async fn authorize(
    directory: &dyn ProjectDirectory,
    project_id: &str,
    caller_id: &str,
) -> Result<(), DeployError> {
    let owner = directory.resolve_project_owner(project_id).await?;
    if owner != caller_id {
        debug!(%project_id, %caller_id, "caller does not own project");
        return Err(DeployError::Permission(
            "You do not have access to this project".to_string(),
        ));
    }
    Ok(())
}
