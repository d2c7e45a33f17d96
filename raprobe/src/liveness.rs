//! Liveness probe: is the stream endpoint answering at all?

use std::time::Duration;

use crate::error::Result;

/// Bounded-timeout reachability check.
///
/// Issues a plain GET through the shared connection pool and inspects only
/// the status line. The body is never read: the response is dropped as soon
/// as the status is known so the connection is released promptly instead of
/// sitting on a live audio stream.
#[derive(Debug, Clone)]
pub struct LivenessProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl LivenessProber {
    /// Create a prober over a shared HTTP client.
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Check whether the station answers with a 2xx status.
    ///
    /// A non-2xx status is a definitive "unavailable" (`Ok(false)`), not an
    /// error; connection failures, timeouts and TLS errors surface as
    /// [`crate::ProbeError`] so the retry policy can take another shot.
    pub async fn check(&self, url: &str) -> Result<bool> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prober() -> LivenessProber {
        LivenessProber::new(reqwest::Client::new(), Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_ok_status_is_available() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stream"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let available = prober()
            .check(&format!("{}/stream", server.uri()))
            .await
            .unwrap();
        assert!(available);
    }

    #[tokio::test]
    async fn test_error_status_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let available = prober().check(&server.uri()).await.unwrap();
        assert!(!available);
    }

    #[tokio::test]
    async fn test_connection_failure_is_an_error() {
        // Nothing listens on port 1
        let result = prober().check("http://127.0.0.1:1/stream").await;
        assert!(result.is_err());
    }
}
