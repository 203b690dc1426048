//! Workload desired-state handlers

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    body::Bytes,
    extract::{Form, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use fleet_types::WorkloadSpec;
use serde::Deserialize;

/// Submit (or replace) the desired state of a workload
///
/// The body is decoded regardless of content type. Any decode, validation or
/// store failure answers 500.
pub async fn submit_workload(State(state): State<AppState>, body: Bytes) -> ApiResult<StatusCode> {
    let spec: WorkloadSpec = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Submission(format!("invalid submission body: {}", e)))?;
    spec.validate()
        .map_err(|e| ApiError::Submission(e.to_string()))?;

    let stored = state.store.submit(spec).await?;

    tracing::info!(
        workload = %stored.name(),
        image = %stored.image(),
        replicas = stored.replicas(),
        selector = %stored.selector(),
        "Submitted workload"
    );

    state.reconciler.trigger_reconcile();

    Ok(StatusCode::OK)
}

/// Observed status of every workload, pretty-printed
pub async fn cluster_status(State(state): State<AppState>) -> ApiResult<Response> {
    let statuses = state.reconciler.observe().await?;

    let body = serde_json::to_vec_pretty(&statuses)
        .map_err(|e| ApiError::Internal(format!("failed to encode status: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// Remove workload parameters
#[derive(Debug, Default, Deserialize)]
pub struct RemoveParams {
    pub name: Option<String>,
}

/// Stop managing a workload
///
/// `name` is read from a url-encoded form body on POST, then from the query
/// string. Blank values count as missing. Running containers are left in place.
pub async fn remove_workload(
    State(state): State<AppState>,
    Query(query): Query<RemoveParams>,
    form: Option<Form<RemoveParams>>,
) -> ApiResult<StatusCode> {
    let name = form
        .and_then(|Form(params)| params.name)
        .filter(|name| !name.trim().is_empty())
        .or_else(|| query.name.filter(|name| !name.trim().is_empty()))
        .ok_or_else(|| {
            ApiError::BadRequest("error removing workload: missing name parameter".to_string())
        })?;

    if state.store.remove(&name).await? {
        tracing::info!(workload = %name, "Removed workload");
    } else {
        tracing::debug!(workload = %name, "Remove requested for unknown workload");
    }

    Ok(StatusCode::OK)
}
