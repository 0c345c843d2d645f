//! Infrastructure adapters for configuration, logging, and page persistence.

pub mod config;
pub mod document;
pub mod logging;
pub mod snapshot;
