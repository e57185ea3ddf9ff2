use axum::{
    Router,
    routing::get,
    extract::{Json, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use crate::error::{Error, Result};
use crate::health::HealthMonitor;
use crate::observability::metrics;

/// Shared state of the operator side channel.
pub struct ApiState {
    pub health: HealthMonitor,
}

pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_text))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the side channel until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: Arc<ApiState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::ServerError(format!("metrics endpoint: {}", e)))
}

#[derive(Debug, Serialize)]
struct HealthReport {
    status: String,
    uptime_secs: u64,
}

async fn health_check(State(state): State<Arc<ApiState>>) -> Json<HealthReport> {
    Json(HealthReport {
        status: state.health.status().to_string(),
        uptime_secs: state.health.uptime().as_secs(),
    })
}

async fn metrics_text() -> std::result::Result<impl IntoResponse, StatusCode> {
    let body = metrics::render().map_err(|e| {
        tracing::error!("Failed to render metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
