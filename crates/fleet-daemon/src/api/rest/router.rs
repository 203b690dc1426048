//! API Router configuration

use super::handlers;
use super::state::AppState;
use crate::config::ServerConfig;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Create the control-surface router
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        // Desired state
        .route("/submit", post(handlers::submit_workload))
        .route(
            "/remove",
            get(handlers::remove_workload).post(handlers::remove_workload),
        )
        // Observed state
        .route("/status", get(handlers::cluster_status))
        .route("/health", get(handlers::health_check))
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
