//! Last-known event per job, replayed to late subscribers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{JobEvent, JobId};

/// The most recent event published for a job.
#[derive(Debug, Clone)]
pub struct CachedState {
    /// The event itself, shared with in-flight deliveries.
    pub event: Arc<JobEvent>,
    /// Cache-wide write counter at the time of the write.
    pub revision: u64,
    /// When the event was stored.
    pub updated_at: DateTime<Utc>,
}

/// Replay cache keyed by job id.
///
/// Every write stamps the entry with a strictly increasing revision. A
/// deferred purge captures the revision it was armed for and only removes
/// the entry if nothing has been written since, see
/// [`StateCache::purge_if_unchanged`].
#[derive(Debug, Default)]
pub struct StateCache {
    entries: HashMap<JobId, CachedState>,
    last_revision: u64,
}

impl StateCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the entry for `job_id` and returns its new revision.
    pub fn store(&mut self, job_id: &JobId, event: Arc<JobEvent>) -> u64 {
        self.last_revision = self.last_revision.wrapping_add(1);
        let revision = self.last_revision;
        self.entries.insert(
            job_id.clone(),
            CachedState {
                event,
                revision,
                updated_at: Utc::now(),
            },
        );
        revision
    }

    /// Returns the cached entry for `job_id`.
    #[must_use]
    pub fn get(&self, job_id: &JobId) -> Option<&CachedState> {
        self.entries.get(job_id)
    }

    /// Returns the cached event for `job_id`.
    #[must_use]
    pub fn latest(&self, job_id: &JobId) -> Option<Arc<JobEvent>> {
        self.entries.get(job_id).map(|state| Arc::clone(&state.event))
    }

    /// Removes the entry for `job_id` if its revision is still `revision`.
    ///
    /// Returns `true` if an entry was removed.
    pub fn purge_if_unchanged(&mut self, job_id: &JobId, revision: u64) -> bool {
        match self.entries.get(job_id) {
            Some(state) if state.revision == revision => {
                self.entries.remove(job_id);
                true
            }
            _ => false,
        }
    }

    /// Returns the number of cached jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
