//! # machpatch Utilities
//!
//! Shared helpers for the machpatch workspace: `tracing` setup and the
//! interactive confirmation prompt.

pub mod logging;
pub mod prompt;

// Re-export commonly used functions for convenience
pub use logging::{init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingError, LoggingGuard};
pub use prompt::{confirm, confirm_with, parse_bool_answer};
pub use tracing::{debug, error, info, trace, warn};
