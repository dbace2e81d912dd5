//! Deployment models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::DeployError;
use crate::utils::generate_uuid;

/// Target publish platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    Vercel,
    Netlify,
    CloudflarePages,
    GithubPages,
    AwsAmplify,
    FirebaseHosting,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Vercel,
        Platform::Netlify,
        Platform::CloudflarePages,
        Platform::GithubPages,
        Platform::AwsAmplify,
        Platform::FirebaseHosting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Vercel => "vercel",
            Platform::Netlify => "netlify",
            Platform::CloudflarePages => "cloudflare-pages",
            Platform::GithubPages => "github-pages",
            Platform::AwsAmplify => "aws-amplify",
            Platform::FirebaseHosting => "firebase-hosting",
        }
    }

    /// Public domain sites on this platform are served from
    pub fn domain(&self) -> &'static str {
        match self {
            Platform::Vercel => "vercel.app",
            Platform::Netlify => "netlify.app",
            Platform::CloudflarePages => "pages.dev",
            Platform::GithubPages => "github.io",
            Platform::AwsAmplify => "amplifyapp.com",
            Platform::FirebaseHosting => "web.app",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| DeployError::Validation(format!("Unsupported platform: {}", s)))
    }
}

/// Deployment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    /// Created, executor not started yet
    Pending,

    /// Executor is running pipeline steps
    Building,

    /// All steps succeeded
    Success,

    /// A step failed
    Failed,

    /// Cancelled by a caller
    Cancelled,
}

impl DeploymentStatus {
    /// Whether no further transition can leave this status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentStatus::Success | DeploymentStatus::Failed | DeploymentStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Pending => "pending",
            DeploymentStatus::Building => "building",
            DeploymentStatus::Success => "success",
            DeploymentStatus::Failed => "failed",
            DeploymentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a deployment log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEntryLevel {
    Info,
    Warn,
    Error,
}

/// A single deployment log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogEntryLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogEntryLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogEntryLevel::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogEntryLevel::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogEntryLevel::Error, message)
    }
}

/// Keys of the configuration bag that must hold strings when present
const STRING_KEYS: [&str; 2] = ["buildCommand", "outputDirectory"];

/// Key of the configuration bag holding environment variables
const ENVIRONMENT_KEY: &str = "environmentVariables";

/// Validated deployment request
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentConfig {
    pub platform: Platform,
    pub configuration: Map<String, Value>,
}

impl DeploymentConfig {
    /// Platform string of an untyped request field
    pub fn required_platform(value: Option<&Value>) -> Result<&str, DeployError> {
        match value {
            Some(Value::String(platform)) => Ok(platform.as_str()),
            None | Some(Value::Null) => Err(DeployError::Validation("Missing platform".to_string())),
            Some(_) => Err(DeployError::Validation("Platform must be a string".to_string())),
        }
    }

    /// Validate a raw platform string and configuration bag.
    ///
    /// The bag is kept verbatim; only the shape of the well-known keys is checked.
    pub fn parse(platform: &str, configuration: Map<String, Value>) -> Result<Self, DeployError> {
        let platform = platform.parse::<Platform>()?;

        for key in STRING_KEYS {
            if let Some(value) = configuration.get(key) {
                if !value.is_string() {
                    return Err(DeployError::Validation(format!(
                        "Configuration field '{}' must be a string",
                        key
                    )));
                }
            }
        }

        if let Some(env) = configuration.get(ENVIRONMENT_KEY) {
            let valid = env
                .as_object()
                .map(|vars| vars.values().all(Value::is_string))
                .unwrap_or(false);
            if !valid {
                return Err(DeployError::Validation(format!(
                    "Configuration field '{}' must be an object of strings",
                    ENVIRONMENT_KEY
                )));
            }
        }

        Ok(Self {
            platform,
            configuration,
        })
    }

    /// Build output directory, `dist` when not configured
    pub fn output_directory(&self) -> &str {
        self.configuration
            .get("outputDirectory")
            .and_then(Value::as_str)
            .unwrap_or("dist")
    }
}

/// One deployment attempt of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub id: String,
    pub project_id: String,
    pub status: DeploymentStatus,
    pub platform: Platform,
    pub configuration: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub is_rollback: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_from_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl DeploymentRecord {
    /// Create a pending record for a fresh deployment
    pub fn new(project_id: &str, config: DeploymentConfig) -> Self {
        let now = Utc::now();
        Self {
            id: generate_uuid(),
            project_id: project_id.to_string(),
            status: DeploymentStatus::Pending,
            platform: config.platform,
            configuration: config.configuration,
            url: None,
            preview_url: None,
            error: None,
            is_rollback: false,
            rollback_from_id: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            logs: Vec::new(),
        }
    }

    /// Create a pending record restoring the platform and configuration of `target`
    pub fn rollback_of(target: &DeploymentRecord) -> Self {
        let mut record = Self::new(&target.project_id, target.config());
        record.is_rollback = true;
        record.rollback_from_id = Some(target.id.clone());
        record
    }

    /// Platform and configuration this record was created with
    pub fn config(&self) -> DeploymentConfig {
        DeploymentConfig {
            platform: self.platform,
            configuration: self.configuration.clone(),
        }
    }
}
