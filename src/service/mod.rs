//! Service layer: the progress hub and its cleanup scheduler.

pub mod cleanup;
pub mod progress_hub;

pub use cleanup::{CleanupPolicy, CleanupScheduler};
pub use progress_hub::{HubSettings, HubStats, JobSnapshot, ProgressHub, PublishReport};
