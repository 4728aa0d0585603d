//! Live subscriber registrations per job.
//!
//! [`ConnectionRegistry`] is a plain data structure with no interior
//! locking; the hub keeps it behind its own mutex together with the
//! [`super::StateCache`] so that attach-and-replay and publish-and-snapshot
//! are each atomic.

use std::collections::HashMap;

use super::{Connection, ConnectionId, JobId};

/// Mapping of job id to the connections currently watching it.
///
/// # Invariants
///
/// - A job has an entry iff at least one connection is attached to it.
/// - A connection is registered under at most one job.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    jobs: HashMap<JobId, HashMap<ConnectionId, Connection>>,
    owners: HashMap<ConnectionId, JobId>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `connection` under `job_id`.
    ///
    /// Re-registering the same connection replaces the previous
    /// registration. If it was attached to a different job it is moved,
    /// and that job's id is returned.
    pub fn insert(&mut self, job_id: &JobId, connection: Connection) -> Option<JobId> {
        let id = connection.id();
        let previous = match self.owners.insert(id, job_id.clone()) {
            Some(old) if old != *job_id => {
                self.detach(&old, id);
                Some(old)
            }
            _ => None,
        };
        self.jobs
            .entry(job_id.clone())
            .or_default()
            .insert(id, connection);
        previous
    }

    /// Removes `connection_id` from `job_id`.
    ///
    /// Returns `false` if the connection was not registered under that job.
    pub fn remove(&mut self, job_id: &JobId, connection_id: ConnectionId) -> bool {
        if self.owners.get(&connection_id) != Some(job_id) {
            return false;
        }
        self.owners.remove(&connection_id);
        self.detach(job_id, connection_id);
        true
    }

    /// Removes every id in `connection_ids` from `job_id` in one pass.
    ///
    /// Returns the number of connections actually removed.
    pub fn remove_many(&mut self, job_id: &JobId, connection_ids: &[ConnectionId]) -> usize {
        connection_ids
            .iter()
            .filter(|id| self.remove(job_id, **id))
            .count()
    }

    /// Returns a copy of the connections attached to `job_id`.
    #[must_use]
    pub fn snapshot(&self, job_id: &JobId) -> Vec<Connection> {
        self.jobs
            .get(job_id)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns `true` if `connection_id` is registered under `job_id`.
    #[must_use]
    pub fn contains(&self, job_id: &JobId, connection_id: ConnectionId) -> bool {
        self.owners.get(&connection_id) == Some(job_id)
    }

    /// Returns the number of connections attached to `job_id`.
    #[must_use]
    pub fn connection_count(&self, job_id: &JobId) -> usize {
        self.jobs.get(job_id).map_or(0, HashMap::len)
    }

    /// Returns `true` if `job_id` has a registry entry.
    #[must_use]
    pub fn has_job(&self, job_id: &JobId) -> bool {
        self.jobs.contains_key(job_id)
    }

    /// Returns the number of jobs with at least one connection.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Returns the total number of registered connections.
    #[must_use]
    pub fn total_connections(&self) -> usize {
        self.owners.len()
    }

    /// Drops every registration, returning how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.owners.len();
        self.owners.clear();
        self.jobs.clear();
        removed
    }

    fn detach(&mut self, job_id: &JobId, connection_id: ConnectionId) {
        if let Some(set) = self.jobs.get_mut(job_id) {
            set.remove(&connection_id);
            if set.is_empty() {
                self.jobs.remove(job_id);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn job(s: &str) -> JobId {
        JobId::from(s)
    }

    #[test]
    fn insert_creates_entry() {
        let mut reg = ConnectionRegistry::new();
        let (conn, _sub) = Connection::channel(1);
        let id = conn.id();
        assert!(reg.insert(&job("a"), conn).is_none());
        assert!(reg.has_job(&job("a")));
        assert!(reg.contains(&job("a"), id));
        assert_eq!(reg.connection_count(&job("a")), 1);
    }

    #[test]
    fn reinsert_same_connection_does_not_duplicate() {
        let mut reg = ConnectionRegistry::new();
        let (conn, _sub) = Connection::channel(1);
        reg.insert(&job("a"), conn.clone());
        reg.insert(&job("a"), conn);
        assert_eq!(reg.connection_count(&job("a")), 1);
        assert_eq!(reg.total_connections(), 1);
    }

    #[test]
    fn insert_under_new_job_moves_connection() {
        let mut reg = ConnectionRegistry::new();
        let (conn, _sub) = Connection::channel(1);
        let id = conn.id();
        reg.insert(&job("a"), conn.clone());
        let previous = reg.insert(&job("b"), conn);
        assert_eq!(previous, Some(job("a")));
        assert!(!reg.has_job(&job("a")));
        assert!(reg.contains(&job("b"), id));
    }

    #[test]
    fn removing_last_connection_deletes_entry() {
        let mut reg = ConnectionRegistry::new();
        let (conn, _sub) = Connection::channel(1);
        let id = conn.id();
        reg.insert(&job("a"), conn);
        assert!(reg.remove(&job("a"), id));
        assert!(!reg.has_job(&job("a")));
        assert_eq!(reg.job_count(), 0);
    }

    #[test]
    fn remove_unknown_is_noop() {
        let mut reg = ConnectionRegistry::new();
        let (conn, _sub) = Connection::channel(1);
        let id = conn.id();
        assert!(!reg.remove(&job("a"), id));

        reg.insert(&job("a"), conn);
        assert!(!reg.remove(&job("b"), id));
        assert!(reg.contains(&job("a"), id));
    }

    #[test]
    fn remove_many_counts_only_registered() {
        let mut reg = ConnectionRegistry::new();
        let (c1, _s1) = Connection::channel(1);
        let (c2, _s2) = Connection::channel(1);
        let (c3, _s3) = Connection::channel(1);
        let stranger = c3.id();
        let ids = [c1.id(), c2.id(), stranger];
        reg.insert(&job("a"), c1);
        reg.insert(&job("a"), c2);
        assert_eq!(reg.remove_many(&job("a"), &ids), 2);
        assert!(!reg.has_job(&job("a")));
    }

    #[test]
    fn snapshot_is_detached_from_registry() {
        let mut reg = ConnectionRegistry::new();
        let (conn, _sub) = Connection::channel(1);
        let id = conn.id();
        reg.insert(&job("a"), conn);
        let snap = reg.snapshot(&job("a"));
        reg.remove(&job("a"), id);
        assert_eq!(snap.len(), 1);
        assert!(reg.snapshot(&job("a")).is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let mut reg = ConnectionRegistry::new();
        let (c1, _s1) = Connection::channel(1);
        let (c2, _s2) = Connection::channel(1);
        reg.insert(&job("a"), c1);
        reg.insert(&job("b"), c2);
        assert_eq!(reg.clear(), 2);
        assert_eq!(reg.job_count(), 0);
        assert_eq!(reg.total_connections(), 0);
    }
}
