//! Domain layer for the issue tracker
//!
//! This module contains the issue model, the filter and update rules, and the
//! document-store port.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
