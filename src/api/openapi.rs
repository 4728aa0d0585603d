//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto::{
    DeleteResponse, FileListResponse, JobStatusResponse, PublishEventResponse, UploadForm,
    UploadResponse,
};
use super::handlers::{jobs, system, upload};
use crate::domain::JobEvent;
use crate::error::{ErrorBody, ErrorResponse};
use crate::service::{HubStats, PublishReport};
use crate::storage::StoredFile;

/// OpenAPI specification for every REST endpoint.
///
/// The WebSocket endpoint `GET /ws/{job_id}` is not described here; it
/// streams [`JobEvent`] objects as JSON text frames.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "progress-relay",
        description = "Real-time job progress relay with replay for late subscribers"
    ),
    paths(
        jobs::publish_event,
        jobs::get_job,
        upload::upload_audio,
        upload::list_files,
        upload::delete_file,
        system::health_handler,
    ),
    components(schemas(
        JobEvent,
        PublishEventResponse,
        JobStatusResponse,
        PublishReport,
        HubStats,
        UploadForm,
        UploadResponse,
        FileListResponse,
        DeleteResponse,
        StoredFile,
        ErrorResponse,
        ErrorBody,
        system::HealthResponse,
    )),
    tags(
        (name = "Jobs", description = "Publish job events and inspect job state"),
        (name = "Uploads", description = "Audio file storage"),
        (name = "System", description = "Service health"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_rest_path() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/jobs/{job_id}/events",
            "/api/v1/jobs/{job_id}",
            "/upload-audio",
            "/api/upload/files",
            "/api/upload/{filename}",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
