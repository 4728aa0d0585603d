//! Wire models for the object storage API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A file stored in the bucket, as exposed by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoredFile {
    /// File name without the folder prefix.
    pub name: String,
    /// Public download URL.
    pub url: String,
    /// Size in bytes; `0` if the service did not report it.
    pub size: u64,
    /// Upload timestamp, when known.
    pub created_at: Option<DateTime<Utc>>,
}

/// One entry of the storage service's list response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ObjectEntry {
    pub(crate) name: String,
    /// `None` for folder placeholders.
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) metadata: Option<ObjectMetadata>,
}

/// Object metadata attached to list entries.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ObjectMetadata {
    #[serde(default)]
    pub(crate) size: Option<u64>,
}

/// Body of a list request.
#[derive(Debug, Serialize)]
pub(crate) struct ListRequest<'a> {
    pub(crate) prefix: &'a str,
    pub(crate) limit: u32,
    pub(crate) offset: u32,
    #[serde(rename = "sortBy")]
    pub(crate) sort_by: SortBy,
}

/// Sort order for a list request.
#[derive(Debug, Serialize)]
pub(crate) struct SortBy {
    pub(crate) column: &'static str,
    pub(crate) order: &'static str,
}

/// Body of a delete request.
#[derive(Debug, Serialize)]
pub(crate) struct DeleteRequest {
    pub(crate) prefixes: Vec<String>,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn object_entry_tolerates_missing_metadata() {
        let Ok(entry) = serde_json::from_str::<ObjectEntry>(r#"{"name":"a.mp3","id":"1"}"#) else {
            panic!("minimal entry should parse");
        };
        assert_eq!(entry.name, "a.mp3");
        assert!(entry.metadata.is_none());
        assert!(entry.created_at.is_none());
    }

    #[test]
    fn list_request_uses_camel_case_sort_key() {
        let body = ListRequest {
            prefix: "songs",
            limit: 100,
            offset: 0,
            sort_by: SortBy {
                column: "created_at",
                order: "desc",
            },
        };
        let json = serde_json::to_value(&body).unwrap_or_default();
        assert!(json.get("sortBy").is_some());
    }
}
