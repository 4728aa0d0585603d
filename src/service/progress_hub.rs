//! Progress hub: subscribe, publish, replay and cleanup for job events.
//!
//! [`ProgressHub`] is the single explicit instance that owns the
//! [`ConnectionRegistry`], the [`StateCache`] and the [`CleanupScheduler`].
//! It is created once at startup and cloned into every collaborator that
//! needs to publish or subscribe.
//!
//! # Fan-out
//!
//! A publish runs in three phases:
//!
//! 1. under the hub lock, overwrite the cache entry and copy the job's
//!    connection set;
//! 2. with the lock released, deliver to every copied connection
//!    concurrently;
//! 3. re-take the lock once and remove the connections whose delivery
//!    failed.
//!
//! Attaching a subscriber registers it and enqueues the cached replay under
//! the same lock, so a replay can never overtake a later publish.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use utoipa::ToSchema;

use super::cleanup::{CleanupPolicy, CleanupScheduler, DEFAULT_CLEANUP_DELAY};
use crate::domain::{
    Connection, ConnectionId, ConnectionRegistry, DeliveryError, JobEvent, JobId, StateCache,
    Subscriber,
};

/// Default per-subscriber queue capacity.
pub const DEFAULT_CONNECTION_BUFFER: usize = 64;

/// State guarded by the hub lock.
#[derive(Debug, Default)]
pub(crate) struct HubState {
    pub(crate) registry: ConnectionRegistry,
    pub(crate) cache: StateCache,
}

/// Tunables for a [`ProgressHub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubSettings {
    /// Grace period between a terminal event and the purge of its state.
    pub cleanup_delay: Duration,
    /// Which terminal events arm a purge.
    pub cleanup_policy: CleanupPolicy,
    /// Capacity of each subscriber queue.
    pub connection_buffer: usize,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            cleanup_delay: DEFAULT_CLEANUP_DELAY,
            cleanup_policy: CleanupPolicy::default(),
            connection_buffer: DEFAULT_CONNECTION_BUFFER,
        }
    }
}

/// Outcome of a single publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct PublishReport {
    /// Connections the event was handed to.
    pub delivered: usize,
    /// Connections dropped because delivery failed.
    pub pruned: usize,
}

/// Point-in-time view of one job.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    /// Number of attached subscribers.
    pub subscribers: usize,
    /// Last published event, if still cached.
    pub last_event: Option<Arc<JobEvent>>,
    /// When the cached event was published.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Hub-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct HubStats {
    /// Jobs with at least one subscriber.
    pub active_jobs: usize,
    /// Subscribers across all jobs.
    pub connections: usize,
    /// Jobs with a replayable cached event.
    pub cached_jobs: usize,
}

/// Broadcasts job progress events to live subscribers.
#[derive(Debug, Clone)]
pub struct ProgressHub {
    state: Arc<Mutex<HubState>>,
    cleanup: Arc<CleanupScheduler>,
    connection_buffer: usize,
}

impl ProgressHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new(settings: HubSettings) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState::default())),
            cleanup: Arc::new(CleanupScheduler::new(
                settings.cleanup_delay,
                settings.cleanup_policy,
            )),
            connection_buffer: settings.connection_buffer,
        }
    }

    /// Attaches a new subscriber to `job_id` and returns its receiving end.
    ///
    /// If the job has a cached event, it is already queued on the returned
    /// [`Subscriber`].
    pub async fn connect(&self, job_id: &JobId) -> Subscriber {
        let (connection, subscriber) = Connection::channel(self.connection_buffer);
        self.subscribe(job_id, connection).await;
        subscriber
    }

    /// Registers `connection` under `job_id` and replays the cached event to
    /// it alone.
    ///
    /// Registering a connection that is already attached replaces the
    /// earlier registration. The replay is a non-blocking enqueue. A closed
    /// connection is dropped, as it would be on a failed publish; a full
    /// queue keeps the registration and skips the replay, since it already
    /// holds events at least as new as the cached one.
    pub async fn subscribe(&self, job_id: &JobId, connection: Connection) {
        let connection_id = connection.id();
        let mut state = self.state.lock().await;
        let replay = state.cache.latest(job_id);
        if let Some(previous) = state.registry.insert(job_id, connection.clone()) {
            tracing::debug!(%job_id, %connection_id, previous_job = %previous, "connection moved");
        }

        let Some(event) = replay else {
            tracing::debug!(%job_id, %connection_id, "subscriber attached");
            return;
        };
        match connection.try_deliver(event) {
            Ok(()) => tracing::debug!(%job_id, %connection_id, "subscriber attached with replay"),
            Err(DeliveryError::Full(_)) => {
                tracing::debug!(%job_id, %connection_id, "queue full, replay skipped");
            }
            Err(err @ DeliveryError::Closed(_)) => {
                state.registry.remove(job_id, connection_id);
                tracing::debug!(%job_id, %connection_id, error = %err, "replay failed, subscriber dropped");
            }
        }
    }

    /// Detaches `connection_id` from `job_id`.
    ///
    /// Returns `false` if it was not attached. The job's cached state is
    /// left alone.
    pub async fn unsubscribe(&self, job_id: &JobId, connection_id: ConnectionId) -> bool {
        let removed = self
            .state
            .lock()
            .await
            .registry
            .remove(job_id, connection_id);
        if removed {
            tracing::debug!(%job_id, %connection_id, "subscriber detached");
        }
        removed
    }

    /// Detaches and drops the transport's [`Subscriber`].
    pub async fn disconnect(&self, job_id: &JobId, subscriber: Subscriber) -> bool {
        let connection_id = subscriber.id();
        drop(subscriber);
        self.unsubscribe(job_id, connection_id).await
    }

    /// Records `event` as the job's latest state and fans it out to every
    /// attached subscriber.
    ///
    /// Never fails. Subscribers whose delivery fails are removed once the
    /// fan-out completes. A terminal event arms a deferred purge of the
    /// cached state according to the configured [`CleanupPolicy`].
    pub async fn publish(&self, job_id: &JobId, event: JobEvent) -> PublishReport {
        let event = Arc::new(event);

        let (targets, revision) = {
            let mut state = self.state.lock().await;
            let revision = state.cache.store(job_id, Arc::clone(&event));
            (state.registry.snapshot(job_id), revision)
        };

        if self.cleanup.should_arm(&event) {
            self.cleanup
                .arm(Arc::clone(&self.state), job_id.clone(), revision);
        }

        let outcomes = join_all(
            targets
                .iter()
                .map(|connection| connection.deliver(Arc::clone(&event))),
        )
        .await;

        let failed: Vec<ConnectionId> = outcomes
            .into_iter()
            .filter_map(Result::err)
            .map(|err| {
                tracing::debug!(%job_id, error = %err, "delivery failed");
                err.connection_id()
            })
            .collect();

        let pruned = if failed.is_empty() {
            0
        } else {
            self.state
                .lock()
                .await
                .registry
                .remove_many(job_id, &failed)
        };

        let report = PublishReport {
            delivered: targets.len().saturating_sub(failed.len()),
            pruned,
        };
        tracing::debug!(
            %job_id,
            event_type = event.event_type_str(),
            delivered = report.delivered,
            pruned = report.pruned,
            "event published"
        );
        report
    }

    /// Publishes a `stage_update` event.
    pub async fn publish_stage_update(
        &self,
        job_id: &JobId,
        stage: u32,
        name: &str,
        status: &str,
        total_stages: u32,
    ) -> PublishReport {
        self.publish(job_id, JobEvent::stage_update(stage, name, status, total_stages))
            .await
    }

    /// Publishes a `log` event.
    pub async fn publish_log(&self, job_id: &JobId, message: &str, level: &str) -> PublishReport {
        self.publish(job_id, JobEvent::log(message, level)).await
    }

    /// Publishes a `progress` event.
    pub async fn publish_progress(
        &self,
        job_id: &JobId,
        percent: f64,
        stage: Option<u32>,
    ) -> PublishReport {
        self.publish(job_id, JobEvent::progress(percent, stage))
            .await
    }

    /// Publishes a `complete` event.
    pub async fn publish_complete(
        &self,
        job_id: &JobId,
        locator: &str,
        duration: Option<f64>,
    ) -> PublishReport {
        self.publish(job_id, JobEvent::complete(locator, duration))
            .await
    }

    /// Publishes an `error` event.
    pub async fn publish_error(&self, job_id: &JobId, message: &str) -> PublishReport {
        self.publish(job_id, JobEvent::error(message)).await
    }

    /// Publishes a `paused` event.
    pub async fn publish_paused(&self, job_id: &JobId) -> PublishReport {
        self.publish(job_id, JobEvent::paused()).await
    }

    /// Publishes a `resumed` event.
    pub async fn publish_resumed(&self, job_id: &JobId) -> PublishReport {
        self.publish(job_id, JobEvent::resumed()).await
    }

    /// Publishes a `cancelled` event.
    pub async fn publish_cancelled(&self, job_id: &JobId) -> PublishReport {
        self.publish(job_id, JobEvent::cancelled()).await
    }

    /// Returns the job's subscriber count and cached state, or `None` if the
    /// hub knows nothing about it.
    pub async fn job_snapshot(&self, job_id: &JobId) -> Option<JobSnapshot> {
        let state = self.state.lock().await;
        let subscribers = state.registry.connection_count(job_id);
        let cached = state.cache.get(job_id);
        if subscribers == 0 && cached.is_none() {
            return None;
        }
        Some(JobSnapshot {
            subscribers,
            last_event: cached.map(|c| Arc::clone(&c.event)),
            updated_at: cached.map(|c| c.updated_at),
        })
    }

    /// Returns the number of subscribers attached to `job_id`.
    pub async fn subscriber_count(&self, job_id: &JobId) -> usize {
        self.state.lock().await.registry.connection_count(job_id)
    }

    /// Returns `true` if `connection_id` is attached to `job_id`.
    pub async fn is_subscribed(&self, job_id: &JobId, connection_id: ConnectionId) -> bool {
        self.state
            .lock()
            .await
            .registry
            .contains(job_id, connection_id)
    }

    /// Returns `true` if `job_id` has a registry entry.
    pub async fn has_subscribers(&self, job_id: &JobId) -> bool {
        self.state.lock().await.registry.has_job(job_id)
    }

    /// Returns the cached event for `job_id`.
    pub async fn last_event(&self, job_id: &JobId) -> Option<Arc<JobEvent>> {
        self.state.lock().await.cache.latest(job_id)
    }

    /// Returns hub-wide counters.
    pub async fn stats(&self) -> HubStats {
        let state = self.state.lock().await;
        HubStats {
            active_jobs: state.registry.job_count(),
            connections: state.registry.total_connections(),
            cached_jobs: state.cache.len(),
        }
    }

    /// Cancels pending purges and detaches every subscriber.
    ///
    /// Detached subscribers observe the end of their stream, which lets
    /// transport tasks close their sockets.
    pub async fn shutdown(&self) {
        self.cleanup.shutdown();
        let detached = self.state.lock().await.registry.clear();
        tracing::info!(detached, "progress hub shut down");
    }
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new(HubSettings::default())
    }
}
