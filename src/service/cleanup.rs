//! Deferred purge of cached job state after a terminal event.
//!
//! Each terminal publish arms an independent timer. When the timer fires it
//! takes the hub lock and removes the job's cache entry only if the entry
//! still carries the revision captured at arm time, so a stale timer can
//! never discard state written after it was armed.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};

use super::progress_hub::HubState;
use crate::domain::{JobEvent, JobId};

/// Default grace period between a terminal event and the purge.
pub const DEFAULT_CLEANUP_DELAY: Duration = Duration::from_secs(60);

/// Which terminal events arm a purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPolicy {
    /// Only `complete` arms a purge. Failed or cancelled jobs keep their
    /// last state until the process exits.
    CompleteOnly,
    /// `complete`, `error` and `cancelled` all arm a purge.
    #[default]
    AllTerminal,
}

impl CleanupPolicy {
    /// Returns `true` if publishing `event` should arm a purge.
    #[must_use]
    pub const fn arms_on(self, event: &JobEvent) -> bool {
        match self {
            Self::CompleteOnly => matches!(event, JobEvent::Complete { .. }),
            Self::AllTerminal => event.is_terminal(),
        }
    }
}

impl fmt::Display for CleanupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CompleteOnly => f.write_str("complete_only"),
            Self::AllTerminal => f.write_str("all_terminal"),
        }
    }
}

/// Returned when a cleanup policy string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cleanup policy: {0} (expected `complete_only` or `all_terminal`)")]
pub struct UnknownCleanupPolicy(pub String);

impl FromStr for CleanupPolicy {
    type Err = UnknownCleanupPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "complete_only" | "complete" => Ok(Self::CompleteOnly),
            "all_terminal" | "all" => Ok(Self::AllTerminal),
            other => Err(UnknownCleanupPolicy(other.to_string())),
        }
    }
}

/// Arms revision-guarded purge timers.
#[derive(Debug)]
pub struct CleanupScheduler {
    delay: Duration,
    policy: CleanupPolicy,
    shutdown: watch::Sender<bool>,
}

impl CleanupScheduler {
    /// Creates a scheduler that purges `delay` after a qualifying event.
    #[must_use]
    pub fn new(delay: Duration, policy: CleanupPolicy) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            delay,
            policy,
            shutdown,
        }
    }

    /// Returns the configured grace period.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns the configured policy.
    #[must_use]
    pub const fn policy(&self) -> CleanupPolicy {
        self.policy
    }

    /// Returns `true` if `event` should arm a purge under this policy.
    #[must_use]
    pub const fn should_arm(&self, event: &JobEvent) -> bool {
        self.policy.arms_on(event)
    }

    /// Spawns a timer that purges `job_id` if its cache entry is still at
    /// `revision` when the delay elapses.
    ///
    /// Does nothing after [`CleanupScheduler::shutdown`].
    pub(crate) fn arm(&self, state: Arc<Mutex<HubState>>, job_id: JobId, revision: u64) {
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow() {
            return;
        }
        let delay = self.delay;
        tracing::debug!(%job_id, revision, delay_secs = delay.as_secs(), "cleanup armed");

        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    tracing::debug!(%job_id, revision, "cleanup cancelled by shutdown");
                    return;
                }
            }

            let purged = state
                .lock()
                .await
                .cache
                .purge_if_unchanged(&job_id, revision);
            if purged {
                tracing::info!(%job_id, revision, "job state purged");
            } else {
                tracing::debug!(%job_id, revision, "cleanup superseded by newer activity");
            }
        });
    }

    /// Cancels every pending timer and refuses to arm new ones.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

impl Default for CleanupScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_CLEANUP_DELAY, CleanupPolicy::default())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn all_terminal_arms_on_three_kinds() {
        let policy = CleanupPolicy::AllTerminal;
        assert!(policy.arms_on(&JobEvent::complete("u", None)));
        assert!(policy.arms_on(&JobEvent::error("e")));
        assert!(policy.arms_on(&JobEvent::cancelled()));
        assert!(!policy.arms_on(&JobEvent::paused()));
    }

    #[test]
    fn complete_only_ignores_failures() {
        let policy = CleanupPolicy::CompleteOnly;
        assert!(policy.arms_on(&JobEvent::complete("u", None)));
        assert!(!policy.arms_on(&JobEvent::error("e")));
        assert!(!policy.arms_on(&JobEvent::cancelled()));
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!("complete_only".parse(), Ok(CleanupPolicy::CompleteOnly));
        assert_eq!(" ALL_TERMINAL ".parse(), Ok(CleanupPolicy::AllTerminal));
        assert!("sometimes".parse::<CleanupPolicy>().is_err());
    }

    #[test]
    fn policy_display_round_trips() {
        for policy in [CleanupPolicy::CompleteOnly, CleanupPolicy::AllTerminal] {
            assert_eq!(policy.to_string().parse(), Ok(policy));
        }
    }

    #[test]
    fn default_delay_is_one_minute() {
        let scheduler = CleanupScheduler::default();
        assert_eq!(scheduler.delay(), Duration::from_secs(60));
        assert_eq!(scheduler.policy(), CleanupPolicy::AllTerminal);
    }
}
