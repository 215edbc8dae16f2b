//! Bumper Common Utilities
//!
//! Shared infrastructure for all Bumper crates:
//! - Error types, error kinds and result aliases
//! - Tracing/logging initialization
//! - Configuration loading (renderer install, transcoder, logging)

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
