//! Application configuration options

use std::collections::HashMap;
use std::time::Duration;

use crate::deploy::executor::PipelineSettings;
use crate::errors::DeployError;
use crate::storage::settings::{PublisherKind, Settings};

/// Main application options
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Enable the HTTP server
    pub enable_server: bool,

    /// Server configuration
    pub server: ServerOptions,

    /// Pipeline settings
    pub pipeline: PipelineSettings,

    /// Publish backend
    pub publisher: PublisherOptions,

    /// Project → owner map for the static project directory
    pub projects: HashMap<String, String>,
}

impl AppOptions {
    /// Build options from a settings file
    pub fn from_settings(settings: &Settings) -> Result<Self, DeployError> {
        let publisher = match settings.publisher.kind {
            PublisherKind::Simulated => PublisherOptions::Simulated,
            PublisherKind::Http => {
                let base_url = settings.publisher.base_url.clone().ok_or_else(|| {
                    DeployError::Config("publisher.base_url is required for the http publisher".to_string())
                })?;
                PublisherOptions::Http {
                    base_url,
                    timeout: Duration::from_secs(settings.publisher.timeout_secs),
                }
            }
        };

        let pipeline_grace = Duration::from_secs(settings.shutdown_grace_secs);

        Ok(Self {
            lifecycle: LifecycleOptions {
                pipeline_grace,
                max_shutdown_delay: pipeline_grace + Duration::from_secs(10),
            },
            enable_server: true,
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            pipeline: PipelineSettings {
                step_delay: Duration::from_millis(settings.pipeline.step_delay_ms),
            },
            publisher,
            projects: settings.projects.clone(),
        })
    }
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Time running pipelines get to finish on shutdown
    pub pipeline_grace: Duration,

    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            pipeline_grace: Duration::from_secs(30),
            max_shutdown_delay: Duration::from_secs(40),
        }
    }
}

/// Publish backend selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PublisherOptions {
    #[default]
    Simulated,
    Http {
        base_url: String,
        timeout: Duration,
    },
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}
