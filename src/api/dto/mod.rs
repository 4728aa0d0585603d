//! Data Transfer Objects for REST request/response serialization.

pub mod job_dto;
pub mod upload_dto;

pub use job_dto::*;
pub use upload_dto::*;
