//! Shared Utilities for post-social
//!
//! Common functionality used by the frame-to-social-media pipeline:
//! - Logging bootstrap (stderr + rolling log file) and external tool logging
//! - External process execution with timeout and stderr draining
//! - External tools detection
//! - Error categories (recoverable / fatal / optional)
//! - Type-safe file sizes

pub mod error_handler;
pub mod logging;
pub mod tool_process;
pub mod tools;
pub mod types;

pub use error_handler::{ErrorCategory, report_error};
pub use logging::{init_logging, log_external_tool, LogConfig};
pub use tool_process::{
    format_tool_error, run_tool, ToolError, ToolInvocation, ToolOutput, DEFAULT_TOOL_TIMEOUT,
};
pub use tools::{check_tools, ToolAvailability};
pub use types::FileSize;
