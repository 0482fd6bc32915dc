//! Error types for the post-social pipeline.

use shared_utils::{ErrorCategory, ToolError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PostSocialError {
    /// Input unusable or output root not creatable. Nothing was encoded.
    #[error("Setup failed: {message}")]
    Setup {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    /// An external encoder call failed (non-zero exit, missing binary,
    /// timeout).
    #[error("Encoding failed in {tool}: {message}")]
    Encoding {
        tool: String,
        command: String,
        exit_code: Option<i32>,
        diagnostic: String,
        message: String,
    },

    /// The size probe produced nothing we could parse.
    #[error("Could not measure {}: {message}", .path.display())]
    Measurement {
        path: PathBuf,
        output: String,
        message: String,
    },

    #[error("Invalid platform target configuration: {0}")]
    InvalidTarget(String),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PostSocialError {
    pub fn setup(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        PostSocialError::Setup {
            message: message.into(),
            path: Some(path.into()),
            source: None,
        }
    }

    pub fn setup_io(message: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PostSocialError::Setup {
            message: message.into(),
            path: Some(path.into()),
            source: Some(source),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PostSocialError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn measurement(path: impl Into<PathBuf>, output: impl Into<String>, message: impl Into<String>) -> Self {
        PostSocialError::Measurement {
            path: path.into(),
            output: output.into(),
            message: message.into(),
        }
    }

    /// Setup problems abort the run; everything else only costs the current
    /// resolution attempt.
    pub fn category(&self) -> ErrorCategory {
        match self {
            PostSocialError::Setup { .. } | PostSocialError::InvalidTarget(_) => ErrorCategory::Fatal,
            PostSocialError::Encoding { .. }
            | PostSocialError::Measurement { .. }
            | PostSocialError::Io { .. } => ErrorCategory::Recoverable,
        }
    }

    pub fn is_measurement(&self) -> bool {
        matches!(self, PostSocialError::Measurement { .. })
    }
}

impl From<ToolError> for PostSocialError {
    fn from(err: ToolError) -> Self {
        PostSocialError::Encoding {
            tool: err.tool().to_string(),
            command: err.command().to_string(),
            exit_code: err.exit_code(),
            diagnostic: err.diagnostic().to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PostSocialError>;
