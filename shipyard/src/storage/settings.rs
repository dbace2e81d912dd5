//! Settings file management

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::errors::DeployError;
use crate::logs::LogLevel;

/// Orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,

    /// Directory for daily rolling log files; stdout only when absent
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineFileSettings,

    /// Publish backend configuration
    #[serde(default)]
    pub publisher: PublisherSettings,

    /// Known projects and their owners
    #[serde(default)]
    pub projects: HashMap<String, String>,

    /// Seconds to wait for running pipelines on shutdown
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

fn default_shutdown_grace() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            pipeline: PipelineFileSettings::default(),
            publisher: PublisherSettings::default(),
            projects: HashMap::new(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file
    pub async fn read(path: &Path) -> Result<Self, DeployError> {
        let contents = fs::read_to_string(path).await.map_err(|e| {
            DeployError::Config(format!("Unable to read {}: {}", path.display(), e))
        })?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    /// Read settings from `path`, or fall back to defaults when no path is given
    pub async fn load(path: Option<&Path>) -> Result<Self, DeployError> {
        match path {
            Some(path) => Self::read(path).await,
            None => Ok(Self::default()),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineFileSettings {
    /// Simulated work duration per step in milliseconds
    #[serde(default = "default_step_delay")]
    pub step_delay_ms: u64,
}

fn default_step_delay() -> u64 {
    1500
}

impl Default for PipelineFileSettings {
    fn default() -> Self {
        Self {
            step_delay_ms: default_step_delay(),
        }
    }
}

/// Publish backend kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublisherKind {
    #[default]
    Simulated,
    Http,
}

/// Publish backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherSettings {
    #[serde(default)]
    pub kind: PublisherKind,

    /// Base URL of the publish backend, required for `http`
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_publish_timeout")]
    pub timeout_secs: u64,
}

fn default_publish_timeout() -> u64 {
    30
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            kind: PublisherKind::Simulated,
            base_url: None,
            timeout_secs: default_publish_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();

        assert_eq!(settings.log_level, LogLevel::Info);
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.pipeline.step_delay_ms, 1500);
        assert_eq!(settings.publisher.kind, PublisherKind::Simulated);
        assert_eq!(settings.shutdown_grace_secs, 30);
        assert!(settings.projects.is_empty());
    }

    #[test]
    fn test_settings_parse() {
        let settings: Settings = serde_json::from_str(
            r#"{
                "log_level": "debug",
                "server": { "port": 9090 },
                "publisher": { "kind": "http", "base_url": "http://publish.internal" },
                "projects": { "p1": "alice" }
            }"#,
        )
        .unwrap();

        assert_eq!(settings.log_level, LogLevel::Debug);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.publisher.kind, PublisherKind::Http);
        assert_eq!(settings.projects.get("p1").map(String::as_str), Some("alice"));
    }

    #[tokio::test]
    async fn test_missing_file_is_config_error() {
        let result = Settings::read(Path::new("/nonexistent/shipyard.json")).await;
        assert!(matches!(result, Err(DeployError::Config(_))));
    }
}
