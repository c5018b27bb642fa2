//! Error types for the atlantis service layer.

use atlantis_events::PipelineError;

/// Top-level error type for pin generation and explanation requests.
#[derive(Debug, thiserror::Error)]
pub enum AtlantisError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// A request that cannot be served as given.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The generation provider or geocoder failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// A collaborator exceeded its deadline.
    #[error("timed out: {0}")]
    Timeout(String),

    /// No structure could be recovered, even after a retry.
    #[error("unrecoverable generation: {0}")]
    Unrecoverable(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the extraction and cache core.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AtlantisError>;
