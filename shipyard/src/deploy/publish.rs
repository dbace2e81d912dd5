//! Publish backends

use std::time::Duration;

use async_trait::async_trait;
use publish_api::models::{Artifact, PublishErrorResponse, PublishRequest, PublishResponse};
use reqwest::Client;
use tracing::{debug, error};
use url::Url;

use crate::errors::DeployError;
use crate::models::deployment::DeploymentConfig;

/// Publishes a built artifact to its target platform
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        project_id: &str,
        config: &DeploymentConfig,
        artifact: &Artifact,
    ) -> Result<PublishResponse, DeployError>;
}

/// Publisher deriving URLs locally without contacting any platform
#[derive(Debug, Clone, Default)]
pub struct SimulatedPublisher;

/// DNS-safe label derived from a project id
fn slug(project_id: &str) -> String {
    let slug: String = project_id
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "site".to_string()
    } else {
        slug.to_string()
    }
}

#[async_trait]
impl Publisher for SimulatedPublisher {
    async fn publish(
        &self,
        project_id: &str,
        config: &DeploymentConfig,
        artifact: &Artifact,
    ) -> Result<PublishResponse, DeployError> {
        let slug = slug(project_id);
        let domain = config.platform.domain();
        let short_id: String = artifact.deployment_id.chars().take(8).collect();

        Ok(PublishResponse {
            url: format!("https://{}.{}", slug, domain),
            preview_url: format!("https://{}--{}.{}", short_id, slug, domain),
        })
    }
}

/// Publisher delegating to a remote publish backend over HTTP
pub struct HttpPublisher {
    client: Client,
    endpoint: Url,
}

impl HttpPublisher {
    /// Create a publisher posting to `<base_url>/publish`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DeployError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| DeployError::Config(format!("Invalid publisher URL {}: {}", base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join("publish")
            .map_err(|e| DeployError::Config(e.to_string()))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeployError::Config(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    /// Endpoint requests are sent to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish(
        &self,
        project_id: &str,
        config: &DeploymentConfig,
        artifact: &Artifact,
    ) -> Result<PublishResponse, DeployError> {
        let body = PublishRequest {
            project_id: project_id.to_string(),
            platform: config.platform.to_string(),
            artifact: artifact.clone(),
            configuration: config.configuration.clone(),
        };

        debug!("POST {}", self.endpoint);
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<PublishErrorResponse>(&text)
                .map(|e| e.message)
                .unwrap_or(text);
            error!("Publish failed: {} - {}", status, message);
            return Err(DeployError::ExternalService(format!(
                "publish backend returned {}: {}",
                status, message
            )));
        }

        Ok(response.json().await?)
    }
}
