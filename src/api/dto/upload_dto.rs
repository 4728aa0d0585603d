//! Upload, listing and deletion DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::storage::StoredFile;

/// Response body for a successful upload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Always `true`; failures use the error body.
    pub success: bool,
    /// Public URL of the stored file.
    pub url: String,
    /// Stored file name.
    pub filename: String,
    /// Human-readable confirmation.
    pub message: String,
}

/// Response body for the file listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FileListResponse {
    /// Always `true`; failures use the error body.
    pub success: bool,
    /// Stored files, newest first.
    pub files: Vec<StoredFile>,
    /// Number of entries in `files`.
    pub total: usize,
}

/// Response body for a successful delete.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeleteResponse {
    /// Always `true`; failures use the error body.
    pub success: bool,
    /// Human-readable confirmation.
    pub message: String,
}

/// Multipart form accepted by the upload endpoint.
#[derive(Debug, ToSchema)]
pub struct UploadForm {
    /// The MP3 file.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}
