//! Pipeline step definitions

use std::fmt;

use serde_json::Value;

use crate::models::deployment::DeploymentConfig;

/// One step of the deployment pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    FetchSource,
    InstallDependencies,
    RunBuild,
    OptimizeAssets,
    Publish,
    ConfigureRouting,
    Finalize,
}

impl PipelineStep {
    /// Steps in execution order
    pub const ALL: [PipelineStep; 7] = [
        PipelineStep::FetchSource,
        PipelineStep::InstallDependencies,
        PipelineStep::RunBuild,
        PipelineStep::OptimizeAssets,
        PipelineStep::Publish,
        PipelineStep::ConfigureRouting,
        PipelineStep::Finalize,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PipelineStep::FetchSource => "fetch source",
            PipelineStep::InstallDependencies => "install dependencies",
            PipelineStep::RunBuild => "run build",
            PipelineStep::OptimizeAssets => "optimize assets",
            PipelineStep::Publish => "publish",
            PipelineStep::ConfigureRouting => "configure routing",
            PipelineStep::Finalize => "finalize",
        }
    }

    /// Log line announcing the step
    pub fn describe(&self, config: &DeploymentConfig) -> String {
        match self {
            PipelineStep::FetchSource => "Fetching source code...".to_string(),
            PipelineStep::InstallDependencies => "Installing dependencies...".to_string(),
            PipelineStep::RunBuild => match config.configuration.get("buildCommand") {
                Some(Value::String(command)) => format!("Running build: {}", command),
                _ => "Running build...".to_string(),
            },
            PipelineStep::OptimizeAssets => {
                format!("Optimizing assets in {}...", config.output_directory())
            }
            PipelineStep::Publish => format!("Publishing to {}...", config.platform),
            PipelineStep::ConfigureRouting => "Configuring routing...".to_string(),
            PipelineStep::Finalize => "Finalizing deployment...".to_string(),
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_publish_precedes_final_step() {
        let publish = PipelineStep::ALL
            .iter()
            .position(|s| *s == PipelineStep::Publish)
            .unwrap();
        assert!(publish < PipelineStep::ALL.len() - 1);
        assert_eq!(PipelineStep::ALL.last(), Some(&PipelineStep::Finalize));
    }

    #[test]
    fn test_describe_uses_configuration() {
        let configuration = json!({ "buildCommand": "npm run build", "outputDirectory": "out" });
        let config = DeploymentConfig::parse(
            "cloudflare-pages",
            configuration.as_object().cloned().unwrap(),
        )
        .unwrap();

        assert_eq!(
            PipelineStep::RunBuild.describe(&config),
            "Running build: npm run build"
        );
        assert_eq!(
            PipelineStep::OptimizeAssets.describe(&config),
            "Optimizing assets in out..."
        );
        assert_eq!(
            PipelineStep::Publish.describe(&config),
            "Publishing to cloudflare-pages..."
        );
    }
}
