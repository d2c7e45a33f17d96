//! Error types for the pipeline layer

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Fatal pipeline errors.
///
/// Only problems with the stores themselves are fatal; every probe failure
/// is degraded to the `"unknown"` sentinel inside the orchestrator and
/// never surfaces here.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// IO error on the input/output store or claim journal
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input store has no usable header row
    #[error("Input store {path}: header must name the columns: {missing}")]
    MalformedInputHeader { path: String, missing: &'static str },
}
