//! Upload handlers: store, list and delete MP3 files in object storage.

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::api::dto::{DeleteResponse, FileListResponse, UploadForm, UploadResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, RelayError};
use crate::storage::client::validate_object_name;

/// Content types accepted for uploads.
pub const ALLOWED_CONTENT_TYPES: [&str; 3] = ["audio/mpeg", "audio/mp3", "application/octet-stream"];

/// Content type assumed when the client sends none.
const FALLBACK_CONTENT_TYPE: &str = "audio/mpeg";

/// Multipart framing allowance on top of the file size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Returns `true` if `filename` has an `.mp3` extension (any case).
#[must_use]
pub fn is_mp3(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".mp3")
}

/// Checks the file name and declared content type of an upload.
///
/// # Errors
///
/// Returns [`RelayError::InvalidUpload`] if the name is missing, is not a
/// plain MP3 file name, or the content type is not an accepted audio type.
pub fn validate_upload_meta(
    filename: Option<&str>,
    content_type: Option<&str>,
) -> Result<(), RelayError> {
    match filename {
        Some(name) if is_mp3(name) => validate_object_name(name)?,
        _ => {
            return Err(RelayError::InvalidUpload(
                "only MP3 files are allowed; please upload a .mp3 file".to_string(),
            ));
        }
    }
    if let Some(ct) = content_type
        && !ALLOWED_CONTENT_TYPES.contains(&ct)
    {
        return Err(RelayError::InvalidUpload(format!(
            "invalid content type: {ct}; expected audio/mpeg or audio/mp3"
        )));
    }
    Ok(())
}

/// Checks the size of an upload's content.
///
/// # Errors
///
/// Returns [`RelayError::PayloadTooLarge`] above `limit` and
/// [`RelayError::InvalidUpload`] for an empty file.
pub fn validate_upload_size(len: usize, limit: usize) -> Result<(), RelayError> {
    if len > limit {
        return Err(RelayError::PayloadTooLarge { limit });
    }
    if len == 0 {
        return Err(RelayError::InvalidUpload(
            "uploaded file is empty".to_string(),
        ));
    }
    Ok(())
}

fn multipart_error(err: &MultipartError, limit: usize) -> RelayError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RelayError::PayloadTooLarge { limit }
    } else {
        RelayError::InvalidUpload(err.body_text())
    }
}

/// `POST /upload-audio` — Upload an MP3 file and return its public URL.
///
/// # Errors
///
/// Returns [`RelayError`] on invalid input, missing storage credentials or
/// a storage failure.
#[utoipa::path(
    post,
    path = "/upload-audio",
    tag = "Uploads",
    summary = "Upload an MP3 file",
    description = "Validates the multipart `file` field (MP3 only, non-empty, size-limited), stores it in the configured bucket and returns its public URL.",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "Invalid file", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 503, description = "Storage not configured", body = ErrorResponse),
    )
)]
pub async fn upload_audio(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, RelayError> {
    let limit = state.max_upload_bytes;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e, limit))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        tracing::debug!(?filename, ?content_type, "upload received");
        validate_upload_meta(filename.as_deref(), content_type.as_deref())?;

        let data = field.bytes().await.map_err(|e| multipart_error(&e, limit))?;
        validate_upload_size(data.len(), limit)?;

        let filename = filename.unwrap_or_default();
        let url = state
            .storage()?
            .upload(
                data.to_vec(),
                &filename,
                content_type.as_deref().unwrap_or(FALLBACK_CONTENT_TYPE),
            )
            .await?;

        return Ok(Json(UploadResponse {
            success: true,
            url,
            filename,
            message: "File uploaded successfully".to_string(),
        }));
    }

    Err(RelayError::InvalidUpload(
        "missing multipart field `file`".to_string(),
    ))
}

/// `GET /api/upload/files` — List uploaded files.
///
/// # Errors
///
/// Returns [`RelayError`] on missing storage credentials or a storage
/// failure.
#[utoipa::path(
    get,
    path = "/api/upload/files",
    tag = "Uploads",
    summary = "List uploaded files",
    description = "Returns uploaded files with their public URLs, sizes and creation dates, newest first.",
    responses(
        (status = 200, description = "File list", body = FileListResponse),
        (status = 503, description = "Storage not configured", body = ErrorResponse),
    )
)]
pub async fn list_files(State(state): State<AppState>) -> Result<impl IntoResponse, RelayError> {
    let files = state.storage()?.list().await?;
    Ok(Json(FileListResponse {
        success: true,
        total: files.len(),
        files,
    }))
}

/// `DELETE /api/upload/{filename}` — Delete an uploaded file.
///
/// # Errors
///
/// Returns [`RelayError`] on a non-MP3 name, missing storage credentials or
/// a storage failure.
#[utoipa::path(
    delete,
    path = "/api/upload/{filename}",
    tag = "Uploads",
    summary = "Delete an uploaded file",
    params(("filename" = String, Path, description = "File name, e.g. `song.mp3`")),
    responses(
        (status = 200, description = "File deleted", body = DeleteResponse),
        (status = 400, description = "Invalid file name", body = ErrorResponse),
        (status = 503, description = "Storage not configured", body = ErrorResponse),
    )
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, RelayError> {
    validate_object_name(&filename)?;
    if !is_mp3(&filename) {
        return Err(RelayError::InvalidUpload("invalid filename".to_string()));
    }
    state.storage()?.delete(&filename).await?;
    Ok(Json(DeleteResponse {
        success: true,
        message: format!("Successfully deleted {filename}"),
    }))
}

/// Upload routes, mounted at the root level. `max_upload_bytes` sizes the
/// request body limit of the upload endpoint.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/upload-audio",
            post(upload_audio).layer(DefaultBodyLimit::max(
                max_upload_bytes.saturating_add(MULTIPART_OVERHEAD),
            )),
        )
        .route("/api/upload/files", get(list_files))
        .route("/api/upload/{filename}", delete(delete_file))
}
