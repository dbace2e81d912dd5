//! Publish backend models

use serde::{Deserialize, Serialize};

/// Build output handed to the publish backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Deployment the artifact was built for
    pub deployment_id: String,

    /// Directory containing the build output
    pub output_directory: String,
}

/// Publish request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub project_id: String,
    pub platform: String,
    pub artifact: Artifact,
    pub configuration: serde_json::Map<String, serde_json::Value>,
}

/// Publish response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub url: String,
    pub preview_url: String,
}

/// Error body returned by the publish backend on failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishErrorResponse {
    pub message: String,
}
