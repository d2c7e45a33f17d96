//! Error types for the geolocation layer

/// Result type alias for geolocation operations
pub type Result<T> = std::result::Result<T, GeoError>;

/// Errors that can occur during geolocation lookups.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Geolocation API answered with an error status
    #[error("Geolocation API returned status: {0}")]
    ApiStatus(reqwest::StatusCode),

    /// Blocking geocoder request failed
    #[error("Reverse geocoding request failed: {0}")]
    Geocoder(#[from] ureq::Error),

    /// Malformed JSON body
    #[error("Malformed response body: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while reading a response body
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
