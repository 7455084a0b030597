use std::path::PathBuf;

use thiserror::Error;

use crate::llm_client::LlmError;

/// Application-level error type.
/// Every failure is fatal to the review in progress; `main` reports it and exits non-zero.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Required configuration '{key}' is not set")]
    ConfigurationMissing { key: String },

    #[error("Invalid value for '{key}': {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("Remote completion call failed: {0}")]
    RemoteCallFailed(#[from] LlmError),

    #[error("Wrap width must be at least 1 column (got {0})")]
    InvalidWidth(usize),

    #[error("Failed to read prompt file {}: {source}", .path.display())]
    PromptLibrary {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown case submission: {0}")]
    UnknownCase(String),
}
