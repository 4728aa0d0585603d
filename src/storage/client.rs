//! HTTP client for the object storage service.

use super::models::{DeleteRequest, ListRequest, ObjectEntry, SortBy, StoredFile};
use crate::config::StorageConfig;
use crate::error::RelayError;

/// Placeholder object the storage service creates for empty folders.
const FOLDER_PLACEHOLDER: &str = ".emptyFolderPlaceholder";

/// Maximum number of files returned by [`StorageClient::list`].
const LIST_LIMIT: u32 = 100;

/// Storage REST client authenticated with a service role key.
#[derive(Debug, Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    config: StorageConfig,
}

impl StorageClient {
    /// Creates a client for the given settings.
    #[must_use]
    pub fn new(config: StorageConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Returns the bucket path for `filename`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidUpload`] if `filename` is not a plain
    /// file name (see [`validate_object_name`]).
    pub fn object_path(&self, filename: &str) -> Result<String, RelayError> {
        validate_object_name(filename)?;
        let mut segments = self.prefix_segments().collect::<Vec<_>>();
        segments.push(filename);
        Ok(segments.join("/"))
    }

    /// Returns the public download URL for `filename`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidUpload`] for a name that is not a plain
    /// file name and [`RelayError::Internal`] if the configured base URL is
    /// unusable.
    pub fn public_url(&self, filename: &str) -> Result<String, RelayError> {
        self.object_url(&["public"], filename).map(String::from)
    }

    /// Builds `{base}/storage/v1/object/{route..}/{bucket}`, each segment
    /// percent-encoded.
    fn endpoint(&self, route: &[&str]) -> Result<reqwest::Url, RelayError> {
        let base = &self.config.base_url;
        let mut url = reqwest::Url::parse(base)
            .map_err(|e| RelayError::Internal(format!("invalid storage URL {base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| RelayError::Internal(format!("storage URL {base} cannot have a path")))?
            .pop_if_empty()
            .extend(["storage", "v1", "object"])
            .extend(route)
            .push(&self.config.bucket);
        Ok(url)
    }

    /// Builds the endpoint URL for one object under the configured prefix.
    fn object_url(&self, route: &[&str], filename: &str) -> Result<reqwest::Url, RelayError> {
        validate_object_name(filename)?;
        let mut url = self.endpoint(route)?;
        url.path_segments_mut()
            .map_err(|()| RelayError::Internal("storage URL cannot have a path".to_string()))?
            .extend(self.prefix_segments())
            .push(filename);
        Ok(url)
    }

    fn prefix_segments(&self) -> impl Iterator<Item = &str> {
        self.config.prefix.split('/').filter(|s| !s.is_empty())
    }

    /// Uploads `bytes` as `filename`, overwriting any existing object, and
    /// returns its public URL.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidUpload`] for a name that is not a plain
    /// file name, or [`RelayError::Storage`] if the request fails or the
    /// service answers with a non-success status.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String, RelayError> {
        let url = self.object_url(&[], filename)?;
        let size = bytes.len();
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.service_key)
            .header("apikey", &self.config.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;
        ensure_success(response, "upload").await?;

        tracing::info!(filename, size, bucket = %self.config.bucket, "file uploaded");
        self.public_url(filename)
    }

    /// Lists files under the configured prefix, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Storage`] if the request fails or the response
    /// cannot be decoded.
    pub async fn list(&self) -> Result<Vec<StoredFile>, RelayError> {
        let url = self.endpoint(&["list"])?;
        let prefix = self.prefix_segments().collect::<Vec<_>>().join("/");
        let body = ListRequest {
            prefix: &prefix,
            limit: LIST_LIMIT,
            offset: 0,
            sort_by: SortBy {
                column: "created_at",
                order: "desc",
            },
        };
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.service_key)
            .header("apikey", &self.config.service_key)
            .json(&body)
            .send()
            .await?;
        let entries: Vec<ObjectEntry> = ensure_success(response, "list").await?.json().await?;

        entries
            .into_iter()
            .filter(|entry| entry.id.is_some() && entry.name != FOLDER_PLACEHOLDER)
            .map(|entry| {
                Ok::<_, RelayError>(StoredFile {
                    url: self.public_url(&entry.name)?,
                    size: entry.metadata.and_then(|m| m.size).unwrap_or(0),
                    created_at: entry.created_at,
                    name: entry.name,
                })
            })
            .collect()
    }

    /// Deletes `filename`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidUpload`] for a name that is not a plain
    /// file name, or [`RelayError::Storage`] if the request fails or the
    /// service answers with a non-success status.
    pub async fn delete(&self, filename: &str) -> Result<(), RelayError> {
        let prefixes = vec![self.object_path(filename)?];
        let url = self.endpoint(&[])?;
        let response = self
            .http
            .delete(url)
            .bearer_auth(&self.config.service_key)
            .header("apikey", &self.config.service_key)
            .json(&DeleteRequest { prefixes })
            .send()
            .await?;
        ensure_success(response, "delete").await?;

        tracing::info!(filename, bucket = %self.config.bucket, "file deleted");
        Ok(())
    }
}

/// Checks that `name` is a single plain path segment: non-empty, without
/// separators, control characters or `.`/`..` components.
///
/// # Errors
///
/// Returns [`RelayError::InvalidUpload`] otherwise.
pub fn validate_object_name(name: &str) -> Result<(), RelayError> {
    let plain = !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.chars().any(|c| matches!(c, '/' | '\\') || c.is_control());
    if plain {
        Ok(())
    } else {
        Err(RelayError::InvalidUpload(format!("invalid filename: {name:?}")))
    }
}

/// Turns a non-success response into [`RelayError::Storage`], keeping the
/// service's error text.
async fn ensure_success(
    response: reqwest::Response,
    operation: &str,
) -> Result<reqwest::Response, RelayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RelayError::Storage(format!(
        "{operation} failed with status {status}: {body}"
    )))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn client(prefix: &str) -> StorageClient {
        StorageClient::new(StorageConfig {
            base_url: "https://proj.supabase.co".into(),
            service_key: "key".into(),
            bucket: "audio-files".into(),
            prefix: prefix.into(),
        })
    }

    #[test]
    fn object_path_applies_prefix() {
        assert_eq!(client("songs").object_path("a.mp3").ok().as_deref(), Some("songs/a.mp3"));
        assert_eq!(client("/songs/").object_path("a.mp3").ok().as_deref(), Some("songs/a.mp3"));
        assert_eq!(client("").object_path("a.mp3").ok().as_deref(), Some("a.mp3"));
    }

    #[test]
    fn public_url_points_at_public_bucket_path() {
        assert_eq!(
            client("songs").public_url("song.mp3").ok().as_deref(),
            Some("https://proj.supabase.co/storage/v1/object/public/audio-files/songs/song.mp3")
        );
    }

    #[test]
    fn traversal_names_never_reach_a_url() {
        let storage = client("songs");
        for name in ["../x.mp3", "../../private-bucket/evil.mp3", "a/b.mp3", "a\\b.mp3", "..", ""] {
            assert!(
                matches!(storage.object_path(name), Err(RelayError::InvalidUpload(_))),
                "{name:?} must be rejected"
            );
            assert!(storage.object_url(&[], name).is_err(), "{name:?} must be rejected");
        }
    }

    #[test]
    fn upload_url_stays_inside_bucket_prefix() {
        let Ok(url) = client("songs").object_url(&[], "my song #1?.mp3") else {
            panic!("plain name with special characters should be accepted");
        };
        assert_eq!(
            url.path(),
            "/storage/v1/object/audio-files/songs/my%20song%20%231%3F.mp3"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn base_url_with_trailing_slash_is_normalised() {
        let storage = StorageClient::new(StorageConfig {
            base_url: "https://proj.supabase.co/".into(),
            service_key: "key".into(),
            bucket: "audio-files".into(),
            prefix: "songs".into(),
        });
        let Ok(url) = storage.endpoint(&["list"]) else {
            panic!("base URL should parse");
        };
        assert_eq!(url.as_str(), "https://proj.supabase.co/storage/v1/object/list/audio-files");
    }

    #[test]
    fn unusable_base_url_is_an_internal_error() {
        let storage = StorageClient::new(StorageConfig {
            base_url: "not a url".into(),
            service_key: "key".into(),
            bucket: "audio-files".into(),
            prefix: "songs".into(),
        });
        assert!(matches!(
            storage.public_url("a.mp3"),
            Err(RelayError::Internal(_))
        ));
    }
}
