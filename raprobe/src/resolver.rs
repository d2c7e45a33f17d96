//! Hostname resolution for stream URLs.

use std::net::IpAddr;

use tokio::net::lookup_host;
use url::Url;

use crate::error::{ProbeError, Result};

/// Resolve a stream URL to its first IP address.
///
/// DNS failure is a permanent condition for the station's run: this is
/// never wrapped in the retry policy. The lookup has no side effects and
/// the result feeds straight into the geolocation probe.
pub async fn resolve_host(raw_url: &str) -> Result<IpAddr> {
    let parsed = Url::parse(raw_url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| ProbeError::NoHost(raw_url.to_string()))?
        .to_string();
    let port = parsed.port_or_known_default().unwrap_or(80);

    let first = lookup_host((host.as_str(), port)).await?.next();
    first
        .map(|addr| addr.ip())
        .ok_or(ProbeError::NoAddress(host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ip_literal_resolves_to_itself() {
        let ip = resolve_host("http://127.0.0.1:8000/stream").await.unwrap();
        assert_eq!(ip, "127.0.0.1".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_localhost_resolves_to_loopback() {
        let ip = resolve_host("http://localhost/stream").await.unwrap();
        assert!(ip.is_loopback());
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        assert!(matches!(
            resolve_host("not a url").await,
            Err(ProbeError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_an_error() {
        let result = resolve_host("http://stream.invalid./").await;
        assert!(result.is_err());
    }
}
