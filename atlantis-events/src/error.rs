//! Error types for the atlantis-events crate.
//!
//! Per-record problems are never errors here: they are reported as
//! [`Rejection`](crate::extract::Rejection) values. Only
//! caller mistakes (bad configuration, an impossible time window) surface
//! as [`PipelineError`].

/// Errors that can occur when configuring or driving the pin pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Invalid cache configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A time window whose bounds do not parse or are out of order.
    #[error("invalid time window: {0}")]
    InvalidWindow(String),
}

/// Convenience type alias for atlantis-events results.
pub type Result<T> = std::result::Result<T, PipelineError>;
