//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::error::RelayError;
use crate::service::ProgressHub;
use crate::storage::StorageClient;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Progress hub for publishing and subscribing.
    pub hub: ProgressHub,
    /// Object storage client; `None` when credentials are not configured.
    pub storage: Option<Arc<StorageClient>>,
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Returns the storage client.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::StorageNotConfigured`] when no credentials
    /// were provided at startup.
    pub fn storage(&self) -> Result<&StorageClient, RelayError> {
        self.storage
            .as_deref()
            .ok_or(RelayError::StorageNotConfigured)
    }
}
