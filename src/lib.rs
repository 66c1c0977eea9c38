//! URL shortener service
//!
//! Stores URLs under keys derived from their SHA-256 digest, behind one of
//! three interchangeable backends.
//!
//! # Architecture
//! - `storage`: storage contract, memory / append-only file / SQL backends, deletion pipeline
//! - `services`: storage facade and global admission limiter
//! - `api`: HTTP routes, owner sessions and middleware
//! - `config`: configuration loading
//! - `runtime`: server startup and shutdown
//! - `system`: logging

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
