//! Unified Error Handler Module
//!
//! ## Error categories
//! - Recoverable: log a warning and fall back (e.g. try the next resolution)
//! - Fatal: propagate and abort the run
//! - Optional: a non-critical step failed, log and continue

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Recoverable,
    Fatal,
    Optional,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Recoverable => write!(f, "RECOVERABLE"),
            ErrorCategory::Fatal => write!(f, "FATAL"),
            ErrorCategory::Optional => write!(f, "OPTIONAL"),
        }
    }
}

/// Log an error loudly with its category and context.
///
/// Fatal errors go out at ERROR level, recoverable ones at WARN, optional
/// ones at INFO. The caller still decides what to do next.
pub fn report_error(category: ErrorCategory, context: &str, error: &dyn std::error::Error) {
    let mut chain = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    let causes = chain.join(" <- ");

    match category {
        ErrorCategory::Fatal => {
            tracing::error!(category = %category, context, error = %error, causes = %causes, "❌ Operation aborted");
        }
        ErrorCategory::Recoverable => {
            tracing::warn!(category = %category, context, error = %error, causes = %causes, "⚠️ Continuing with fallback");
        }
        ErrorCategory::Optional => {
            tracing::info!(category = %category, context, error = %error, "ℹ️ Non-critical failure, continuing");
        }
    }
}
