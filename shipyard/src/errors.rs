//! Error types for the Shipyard orchestrator

use thiserror::Error;

/// Main error type for the orchestrator
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Permission(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Shutdown error: {0}")]
    Shutdown(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeployError {
    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            DeployError::Validation(_) => "ValidationError",
            DeployError::NotFound(_) => "NotFoundError",
            DeployError::Permission(_) => "PermissionError",
            DeployError::InvalidState(_) => "InvalidStateError",
            DeployError::ExternalService(_) => "ExternalServiceError",
            DeployError::Config(_)
            | DeployError::Server(_)
            | DeployError::Shutdown(_)
            | DeployError::Io(_)
            | DeployError::Json(_) => "InternalError",
        }
    }
}

impl From<reqwest::Error> for DeployError {
    fn from(err: reqwest::Error) -> Self {
        DeployError::ExternalService(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(DeployError::Validation("x".into()).kind(), "ValidationError");
        assert_eq!(DeployError::InvalidState("x".into()).kind(), "InvalidStateError");
        assert_eq!(DeployError::Config("x".into()).kind(), "InternalError");
    }

    #[test]
    fn test_external_service_message() {
        let err = DeployError::ExternalService("publish backend unreachable".into());
        assert_eq!(
            err.to_string(),
            "External service error: publish backend unreachable"
        );
    }
}
