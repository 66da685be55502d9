use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::job::{JobId, JobSpec};

use super::error::ApiError;
use super::models::{ExecutionGroup, ExecutionGroupsResponse, JobsQuery};
use super::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/jobs", get(list_jobs))
        .route("/v1/job", post(post_job))
        .route("/v1/job/{namespace}/{name}", get(get_job).delete(delete_job))
        .route(
            "/v1/job/{namespace}/{name}/executions",
            get(get_job_executions),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<Vec<JobSpec>>, ApiError> {
    let mut jobs = state.store.get_jobs()?;
    if let Some(namespace) = query.namespace {
        jobs.retain(|j| j.id.namespace == namespace);
    }
    Ok(Json(jobs))
}

async fn get_job(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<Json<JobSpec>, ApiError> {
    let job = state.store.get_job(&JobId::new(namespace, name))?;
    Ok(Json(job))
}

async fn delete_job(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let id = JobId::new(namespace, name);
    let deleted = state.store.delete_job(&id)?;

    // Absent from the queue is fine; the job may never have been
    // registered with a dispatcher.
    if let Some(dispatcher) = state.dispatcher_for(&deleted.executor) {
        let _ = dispatcher.deregister(&id);
    }

    Ok((StatusCode::ACCEPTED, Json(deleted)))
}

async fn get_job_executions(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<Json<ExecutionGroupsResponse>, ApiError> {
    let id = JobId::new(namespace, name);
    // 404 for an unknown job rather than an empty listing.
    state.store.get_job(&id)?;

    let (mut grouped, by_group) = state.store.get_grouped_executions(&id)?;
    let groups = by_group
        .into_iter()
        .map(|group| ExecutionGroup {
            group,
            instances: grouped.remove(&group).unwrap_or_default(),
        })
        .collect();
    Ok(Json(ExecutionGroupsResponse { groups }))
}

/// Creates or updates a job from a JSON or YAML body, then registers it
/// with the dispatcher serving its executor kind.
async fn post_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let spec = decode_job(&headers, &body)?;

    // An executor kind nobody serves would produce a job that can never
    // run; reject it up front instead of defaulting silently.
    if state.dispatcher_for(&spec.executor).is_none() {
        return Err(ApiError::Validation(format!(
            "unknown executor kind: {}",
            spec.executor
        )));
    }

    let stored = state.store.set_job(spec)?;
    debug!(job = %stored.id, "stored job via api");

    if let Some(dispatcher) = state.dispatcher_for(&stored.executor) {
        if let Err(e) = dispatcher.register(stored.clone()) {
            // Kind was checked above; this only fires on a racing
            // registry change and the job stays stored either way.
            warn!(job = %stored.id, error = %e, "failed to queue job");
        }
    }

    Ok((StatusCode::CREATED, Json(stored)))
}

fn decode_job(headers: &HeaderMap, body: &[u8]) -> Result<JobSpec, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(mime::APPLICATION_JSON.as_ref());

    let media: mime::Mime = content_type
        .parse()
        .map_err(|_| ApiError::UnsupportedMediaType(content_type.to_string()))?;

    match (media.type_().as_str(), media.subtype().as_str()) {
        ("application", "json") => serde_json::from_slice(body)
            .map_err(|e| ApiError::InvalidPayload(e.to_string())),
        ("application" | "text", "yaml" | "x-yaml") => serde_yml::from_slice(body)
            .map_err(|e| ApiError::InvalidPayload(e.to_string())),
        _ => Err(ApiError::UnsupportedMediaType(content_type.to_string())),
    }
}
