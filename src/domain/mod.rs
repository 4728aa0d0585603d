//! Domain layer: job identity, progress events, and the broadcast core's
//! data structures.
//!
//! The registry and the cache carry no locks of their own; synchronization
//! is owned by [`crate::service::ProgressHub`].

pub mod connection;
pub mod connection_registry;
pub mod job_event;
pub mod job_id;
pub mod state_cache;

pub use connection::{Connection, ConnectionId, DeliveryError, Subscriber};
pub use connection_registry::ConnectionRegistry;
pub use job_event::{EventFields, JobEvent};
pub use job_id::JobId;
pub use state_cache::{CachedState, StateCache};
