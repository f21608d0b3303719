//! Error types for searchpipe
//!
//! Configuration problems fail fast at construction. Empty results and
//! unresolvable keys are never errors; failures inside external
//! retriever/ranker/encoder collaborators are surfaced unchanged.

use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for searchpipe
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Stage configuration rejected at construction
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A document handed to `add` has no usable value under the declared
    /// key field
    #[error("Missing key: document has no usable '{field}' field")]
    MissingKey { field: String },

    /// An external retriever/ranker/encoder/transformer failed.
    /// The composition layer has no domain knowledge to recover from
    /// these, so they propagate to the caller unchanged.
    #[error("Collaborator error: {source}")]
    Collaborator {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl PipelineError {
    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a missing key error
    pub fn missing_key(field: impl Into<String>) -> Self {
        Self::MissingKey {
            field: field.into(),
        }
    }

    /// Wrap an error raised by an external collaborator
    pub fn collaborator(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Collaborator {
            source: source.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Check if this error came from an external collaborator
    pub fn is_collaborator(&self) -> bool {
        matches!(self, Self::Collaborator { .. })
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
