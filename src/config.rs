//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::time::Duration;

use crate::service::{CleanupPolicy, HubSettings};

/// Default upload size limit (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8000`).
    pub listen_addr: SocketAddr,

    /// Seconds to keep a finished job's last state for late subscribers.
    pub cleanup_delay_secs: u64,

    /// Which terminal events arm the purge.
    pub cleanup_policy: CleanupPolicy,

    /// Undelivered events buffered per subscriber.
    pub connection_buffer: usize,

    /// Seconds before a plain HTTP request is abandoned.
    pub request_timeout_secs: u64,

    /// Largest accepted upload in bytes.
    pub max_upload_bytes: usize,

    /// Object storage settings; `None` when credentials are missing.
    pub storage: Option<StorageConfig>,
}

/// Object storage connection settings.
#[derive(Clone)]
pub struct StorageConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    /// Service role key sent as bearer token.
    pub service_key: String,
    /// Bucket holding uploaded files.
    pub bucket: String,
    /// Folder inside the bucket; empty for the bucket root.
    pub prefix: String,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("base_url", &self.base_url)
            .field("service_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` cannot be parsed as a
    /// [`SocketAddr`] or `CLEANUP_POLICY` names an unknown policy.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
            .parse()?;

        let cleanup_policy = match std::env::var("CLEANUP_POLICY") {
            Ok(raw) => raw.parse()?,
            Err(_) => CleanupPolicy::default(),
        };

        Ok(Self {
            listen_addr,
            cleanup_delay_secs: parse_env("CLEANUP_DELAY_SECS", 60),
            cleanup_policy,
            connection_buffer: parse_env("CONNECTION_BUFFER", 64),
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 120),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            storage: StorageConfig::from_env(),
        })
    }

    /// Returns the progress hub settings derived from this configuration.
    #[must_use]
    pub const fn hub_settings(&self) -> HubSettings {
        HubSettings {
            cleanup_delay: Duration::from_secs(self.cleanup_delay_secs),
            cleanup_policy: self.cleanup_policy,
            connection_buffer: self.connection_buffer,
        }
    }
}

impl StorageConfig {
    /// Reads storage settings, returning `None` unless both `SUPABASE_URL`
    /// and `SUPABASE_SERVICE_KEY` are set and non-empty.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = non_empty_env("SUPABASE_URL")?;
        let service_key = non_empty_env("SUPABASE_SERVICE_KEY")?;
        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            bucket: non_empty_env("STORAGE_BUCKET").unwrap_or_else(|| "audio-files".to_string()),
            prefix: std::env::var("STORAGE_PREFIX").unwrap_or_else(|_| "songs".to_string()),
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn hub_settings_follow_config() {
        let config = RelayConfig {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cleanup_delay_secs: 5,
            cleanup_policy: CleanupPolicy::CompleteOnly,
            connection_buffer: 8,
            request_timeout_secs: 1,
            max_upload_bytes: 10,
            storage: None,
        };
        let settings = config.hub_settings();
        assert_eq!(settings.cleanup_delay, Duration::from_secs(5));
        assert_eq!(settings.cleanup_policy, CleanupPolicy::CompleteOnly);
        assert_eq!(settings.connection_buffer, 8);
    }

    #[test]
    fn storage_debug_redacts_key() {
        let storage = StorageConfig {
            base_url: "https://example.supabase.co".into(),
            service_key: "super-secret".into(),
            bucket: "audio-files".into(),
            prefix: "songs".into(),
        };
        let rendered = format!("{storage:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("audio-files"));
    }

    #[test]
    fn parse_env_falls_back_on_missing_key() {
        let value: u64 = parse_env("PROGRESS_RELAY_TEST_UNSET_KEY", 42);
        assert_eq!(value, 42);
    }
}
