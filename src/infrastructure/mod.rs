//! Infrastructure layer module
//!
//! Process-level concerns around the issue service:
//! - Configuration management
//! - Logging infrastructure

pub mod config;
pub mod logging;
