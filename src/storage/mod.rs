//! Object storage collaborator: upload, list and delete of audio files.
//!
//! The relay talks to a Supabase-style storage REST API with a service
//! role key. Nothing here is used by the broadcast core; a missing or
//! failing storage service only affects the upload endpoints.

pub mod client;
pub mod models;

pub use client::StorageClient;
pub use models::StoredFile;
