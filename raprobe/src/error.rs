//! Error types for the probe layer

use std::time::Duration;

/// Result type alias for probe operations
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Errors that can occur while probing a station.
///
/// All of these are transient from the pipeline's point of view: the retry
/// wrapper turns repeated failures into a "no result" marker, never into a
/// fatal error for the station.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// URL carries no hostname
    #[error("URL has no host: {0}")]
    NoHost(String),

    /// Name resolution returned no address
    #[error("No address resolved for {0}")]
    NoAddress(String),

    /// IO error (DNS lookup, subprocess spawn)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Probe exceeded its time budget
    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),

    /// Media inspection tool exited with a failure status
    #[error("{tool} exited with {status}: {stderr}")]
    Subprocess {
        tool: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// Malformed JSON from the media inspection tool
    #[error("Malformed probe output: {0}")]
    Json(#[from] serde_json::Error),
}
