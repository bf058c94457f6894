//! # Decree Common
//!
//! Foundational types shared by every Decree crate: the error severity
//! classification used across the workspace and the logging helpers used in
//! `tracing` statements.

pub mod error;
pub mod logging;

pub use error::{ErrorSeverity, Severity};
pub use logging::Pretty;
