//! WebSocket layer: one connection per job subscriber.
//!
//! The endpoint at `/ws/{job_id}` streams the job's events, starting with
//! its cached state when there is one.

pub mod connection;
pub mod handler;
pub mod messages;
