//! HTTP request handlers

use std::sync::Arc;

use api_models::models::{
    ErrorResponse, HealthResponse, HistoryQuery, HistoryResponse, LogsQuery, LogsResponse,
    MetricsQuery, MutationResponse, StartDeploymentRequest, StatusResponse, VersionResponse,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use crate::authz::projects::authorize;
use crate::errors::DeployError;
use crate::models::deployment::{DeploymentConfig, DeploymentRecord, DeploymentStatus, LogEntry};
use crate::models::metrics::TimeRange;
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Header carrying the caller's user id
pub const USER_ID_HEADER: &str = "x-user-id";

const DEFAULT_HISTORY_LIMIT: usize = 10;
const MAX_HISTORY_LIMIT: usize = 100;

impl IntoResponse for DeployError {
    fn into_response(self) -> Response {
        let status = match &self {
            DeployError::Validation(_) => StatusCode::BAD_REQUEST,
            DeployError::NotFound(_) => StatusCode::NOT_FOUND,
            DeployError::Permission(_) => StatusCode::FORBIDDEN,
            DeployError::InvalidState(_) => StatusCode::CONFLICT,
            DeployError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, "request rejected");
        }

        let body = ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Resolve the caller from the request headers and check they own the project
async fn authorize_caller(
    state: &ServerState,
    headers: &HeaderMap,
    project_id: &str,
) -> Result<(), DeployError> {
    let caller_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| DeployError::Permission("Missing caller identity".to_string()))?;

    authorize(state.projects.as_ref(), project_id, caller_id).await
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "shipyard".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Start a deployment
pub async fn start_handler(
    State(state): State<Arc<ServerState>>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<StartDeploymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, DeployError> {
    authorize_caller(&state, &headers, &project_id).await?;

    let Json(request) = payload.map_err(|e| DeployError::Validation(e.body_text()))?;
    let platform = DeploymentConfig::required_platform(request.platform.as_ref())?;

    let deployment = state
        .deployments
        .start(&project_id, platform, request.configuration)?;

    Ok((
        StatusCode::CREATED,
        Json(MutationResponse {
            message: "Deployment started".to_string(),
            deployment,
        }),
    ))
}

/// Current deployment of a project
pub async fn status_handler(
    State(state): State<Arc<ServerState>>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse<DeploymentRecord>>, DeployError> {
    authorize_caller(&state, &headers, &project_id).await?;

    Ok(Json(StatusResponse {
        deployment: state.deployments.get_status(&project_id),
    }))
}

/// Deployment logs
pub async fn logs_handler(
    State(state): State<Arc<ServerState>>,
    Path(project_id): Path<String>,
    Query(query): Query<LogsQuery>,
    headers: HeaderMap,
) -> Result<Json<LogsResponse<LogEntry>>, DeployError> {
    authorize_caller(&state, &headers, &project_id).await?;

    let logs = state
        .deployments
        .get_logs(&project_id, query.deployment_id.as_deref());
    Ok(Json(LogsResponse { logs }))
}

/// Deployment history, newest first
pub async fn history_handler(
    State(state): State<Arc<ServerState>>,
    Path(project_id): Path<String>,
    Query(query): Query<HistoryQuery>,
    headers: HeaderMap,
) -> Result<Json<HistoryResponse<DeploymentRecord>>, DeployError> {
    authorize_caller(&state, &headers, &project_id).await?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let deployments = state.deployments.get_history(&project_id, limit);
    let total = state.deployments.store().count(&project_id);

    Ok(Json(HistoryResponse { deployments, total }))
}

/// Cancel a deployment
pub async fn cancel_handler(
    State(state): State<Arc<ServerState>>,
    Path((project_id, deployment_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<MutationResponse<DeploymentRecord>>, DeployError> {
    authorize_caller(&state, &headers, &project_id).await?;

    let deployment = state.deployments.cancel(&project_id, &deployment_id)?;
    let message = match deployment.status {
        DeploymentStatus::Cancelled => "Deployment cancelled".to_string(),
        status => format!("Deployment already {}", status),
    };

    Ok(Json(MutationResponse {
        message,
        deployment,
    }))
}

/// Roll back to a previous successful deployment
pub async fn rollback_handler(
    State(state): State<Arc<ServerState>>,
    Path((project_id, deployment_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, DeployError> {
    authorize_caller(&state, &headers, &project_id).await?;

    let deployment = state.deployments.rollback(&project_id, &deployment_id)?;

    Ok((
        StatusCode::CREATED,
        Json(MutationResponse {
            message: "Rollback started".to_string(),
            deployment,
        }),
    ))
}

/// Metrics of the live deployment
pub async fn metrics_handler(
    State(state): State<Arc<ServerState>>,
    Path(project_id): Path<String>,
    Query(query): Query<MetricsQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, DeployError> {
    authorize_caller(&state, &headers, &project_id).await?;

    let range = match query.time_range.as_deref() {
        Some(value) => value.parse::<TimeRange>()?,
        None => TimeRange::default(),
    };
    let report = state.deployments.get_metrics(&project_id, range).await?;

    Ok(Json(report))
}
