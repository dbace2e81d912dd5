//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::DeployError;
use crate::server::handlers::{
    cancel_handler, health_handler, history_handler, logs_handler, metrics_handler,
    rollback_handler, start_handler, status_handler, version_handler,
};
use crate::server::state::ServerState;

/// Build the API router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Deployments
        .route("/projects/{project_id}/deployments", post(start_handler))
        .route(
            "/projects/{project_id}/deployments/status",
            get(status_handler),
        )
        .route("/projects/{project_id}/deployments/logs", get(logs_handler))
        .route(
            "/projects/{project_id}/deployments/history",
            get(history_handler),
        )
        .route(
            "/projects/{project_id}/deployments/{deployment_id}/cancel",
            post(cancel_handler),
        )
        .route(
            "/projects/{project_id}/deployments/{deployment_id}/rollback",
            post(rollback_handler),
        )
        // Metrics
        .route("/projects/{project_id}/metrics", get(metrics_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), DeployError>>, DeployError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| DeployError::Server(format!("Unable to bind {}: {}", addr, e)))?;

    match listener.local_addr() {
        Ok(local) => info!("Starting HTTP server on {}", local),
        Err(_) => info!("Starting HTTP server on {}", addr),
    }

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| DeployError::Server(e.to_string()))
    });

    Ok(handle)
}
