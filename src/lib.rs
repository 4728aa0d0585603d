//! # progress-relay
//!
//! Real-time relay for background job progress.
//!
//! Producers publish [`domain::JobEvent`]s for a job id; every WebSocket
//! client attached to that job receives them as they happen, and clients
//! that attach late first receive the job's last known event. Once a job
//! reaches a terminal state its cached event is reclaimed after a grace
//! period.
//!
//! ## Architecture
//!
//! ```text
//! Producers (in-process, HTTP)        Subscribers (WebSocket /ws/{job_id})
//!     │                                   │
//!     ├── REST Handlers (api/)            ├── WS Handler (ws/)
//!     │                                   │
//!     └──────────────┬────────────────────┘
//!                    │
//!              ProgressHub (service/)
//!     ├── ConnectionRegistry (domain/)
//!     ├── StateCache (domain/)
//!     └── CleanupScheduler (service/)
//!
//! Upload endpoints (api/) ── StorageClient (storage/) ── object storage
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod service;
pub mod storage;
pub mod ws;
