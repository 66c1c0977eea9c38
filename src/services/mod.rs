//! Service layer for business logic
//!
//! The storage facade and the admission limiter shared by the HTTP handlers.

mod admission;
mod url_service;

pub use admission::AdmissionLimiter;
pub use url_service::{StorageStats, UrlService};
