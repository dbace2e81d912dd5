//! HTTP API models

use serde::{Deserialize, Serialize};

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Deployment request body.
///
/// Everything besides `platform` is kept as the deployment configuration.
/// `platform` is left untyped so a missing or malformed value can be reported
/// by the server's own validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartDeploymentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<serde_json::Value>,

    #[serde(flatten)]
    pub configuration: serde_json::Map<String, serde_json::Value>,
}

/// Query parameters for the logs endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsQuery {
    pub deployment_id: Option<String>,
}

/// Query parameters for the history endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Query parameters for the metrics endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsQuery {
    pub time_range: Option<String>,
}

/// Response of mutating calls (start, cancel, rollback)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResponse<T> {
    pub message: String,
    pub deployment: T,
}

/// Current deployment status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse<T> {
    pub deployment: Option<T>,
}

/// Deployment log listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsResponse<T> {
    pub logs: Vec<T>,
}

/// Deployment history listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse<T> {
    pub deployments: Vec<T>,
    pub total: usize,
}

/// Error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_request_keeps_configuration() {
        let body = r#"{"platform":"netlify","buildCommand":"npm run build","outputDirectory":"dist"}"#;
        let request: StartDeploymentRequest = serde_json::from_str(body).unwrap();

        assert_eq!(request.platform, Some(serde_json::json!("netlify")));
        assert_eq!(request.configuration.len(), 2);
        assert!(!request.configuration.contains_key("platform"));
    }

    #[test]
    fn test_start_request_without_platform() {
        let body = r#"{"buildCommand":"npm run build"}"#;
        let request: StartDeploymentRequest = serde_json::from_str(body).unwrap();

        assert!(request.platform.is_none());
        assert_eq!(request.configuration.len(), 1);
    }

    #[test]
    fn test_logs_query_is_camel_case() {
        let query: LogsQuery = serde_json::from_str(r#"{"deploymentId":"d-1"}"#).unwrap();
        assert_eq!(query.deployment_id.as_deref(), Some("d-1"));
    }
}
