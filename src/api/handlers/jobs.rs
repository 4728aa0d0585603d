//! Job handlers: event submission for out-of-process producers and job
//! status lookups.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{JobStatusResponse, PublishEventResponse};
use crate::app_state::AppState;
use crate::domain::{JobEvent, JobId};
use crate::error::{ErrorResponse, RelayError};

/// `POST /jobs/{job_id}/events` — Publish a progress event.
///
/// # Errors
///
/// Returns [`RelayError::InvalidEvent`] if the body is not a valid event.
#[utoipa::path(
    post,
    path = "/api/v1/jobs/{job_id}/events",
    tag = "Jobs",
    summary = "Publish a job event",
    description = "Records the event as the job's latest state and delivers it to every subscriber currently attached to the job. Publishing to a job without subscribers is valid.",
    params(("job_id" = String, Path, description = "Opaque job identifier")),
    request_body = JobEvent,
    responses(
        (status = 202, description = "Event published", body = PublishEventResponse),
        (status = 400, description = "Malformed event", body = ErrorResponse),
    )
)]
pub async fn publish_event(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    body: Result<Json<JobEvent>, JsonRejection>,
) -> Result<impl IntoResponse, RelayError> {
    let Json(event) = body.map_err(|rejection| RelayError::InvalidEvent(rejection.body_text()))?;
    let job_id = JobId::from(job_id);
    let event_type = event.event_type_str();

    let report = state.hub.publish(&job_id, event).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(PublishEventResponse {
            job_id,
            event_type: event_type.to_string(),
            delivered: report.delivered,
            pruned: report.pruned,
            published_at: Utc::now(),
        }),
    ))
}

/// `GET /jobs/{job_id}` — Subscriber count and cached state of a job.
///
/// # Errors
///
/// Returns [`RelayError::JobNotFound`] if the job has neither subscribers
/// nor cached state.
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{job_id}",
    tag = "Jobs",
    summary = "Get job status",
    description = "Returns the number of attached subscribers and the last cached event. Finished jobs disappear once their grace period has elapsed and no subscriber remains.",
    params(("job_id" = String, Path, description = "Opaque job identifier")),
    responses(
        (status = 200, description = "Job status", body = JobStatusResponse),
        (status = 404, description = "Unknown job", body = ErrorResponse),
    )
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, RelayError> {
    let job_id = JobId::from(job_id);
    let snapshot = state
        .hub
        .job_snapshot(&job_id)
        .await
        .ok_or_else(|| RelayError::JobNotFound(job_id.clone()))?;

    Ok(Json(JobStatusResponse {
        job_id,
        subscribers: snapshot.subscribers,
        last_event: snapshot.last_event.map(|event| (*event).clone()),
        updated_at: snapshot.updated_at,
    }))
}

/// Job routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/jobs/{job_id}", get(get_job))
        .route("/jobs/{job_id}/events", post(publish_event))
}
