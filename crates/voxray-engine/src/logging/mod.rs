//! Logging utilities.
//!
//! This module centralizes logger initialization. The engine itself only
//! emits through the `log` facade; `env_logger` is installed on request.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
