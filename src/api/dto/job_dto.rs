//! Job event submission and status DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{JobEvent, JobId};

/// Response body for `POST /api/v1/jobs/{job_id}/events`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublishEventResponse {
    /// Job the event was published to.
    #[schema(value_type = String)]
    pub job_id: JobId,
    /// Discriminator of the published event.
    pub event_type: String,
    /// Subscribers the event was handed to.
    pub delivered: usize,
    /// Subscribers dropped because delivery failed.
    pub pruned: usize,
    /// Server time of the publish.
    pub published_at: DateTime<Utc>,
}

/// Response body for `GET /api/v1/jobs/{job_id}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobStatusResponse {
    /// Requested job.
    #[schema(value_type = String)]
    pub job_id: JobId,
    /// Number of attached subscribers.
    pub subscribers: usize,
    /// Last published event, if still cached.
    pub last_event: Option<JobEvent>,
    /// When the cached event was published.
    pub updated_at: Option<DateTime<Utc>>,
}
