//! HTTP client for the IP-geolocation API.
//!
//! The service maps an IP address to approximate coordinates, returned in a
//! JSON `"loc"` field as `"lat,lon"`. Lookups are cached per address for
//! the lifetime of the process.

use std::net::IpAddr;
use std::time::Duration;

use serde::Deserialize;

use rastation::UNKNOWN;

use crate::cache::LookupCache;
use crate::error::{GeoError, Result};

/// Default geolocation API base URL
pub const DEFAULT_API_BASE: &str = "https://ipinfo.io";

/// Default timeout for geolocation requests (5 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Approximate coordinates for a resolved address.
///
/// Kept as opaque decimal-string tokens exactly as the service returned
/// them; [`UNKNOWN`] marks a component the service did not provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub latitude: String,
    pub longitude: String,
}

impl Coordinates {
    /// Both components unknown.
    pub fn unknown() -> Self {
        Self {
            latitude: UNKNOWN.to_string(),
            longitude: UNKNOWN.to_string(),
        }
    }

    /// True when both components carry a real value.
    pub fn is_known(&self) -> bool {
        self.latitude != UNKNOWN && self.longitude != UNKNOWN
    }
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    loc: Option<String>,
}

/// Geolocation client with a per-address cache.
#[derive(Debug)]
pub struct GeoLocator {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
    timeout: Duration,
    cache: LookupCache<IpAddr, Coordinates>,
}

impl GeoLocator {
    /// Create a builder for configuring the client
    pub fn builder() -> GeoLocatorBuilder {
        GeoLocatorBuilder::default()
    }

    /// Look up coordinates for a resolved address.
    ///
    /// Cache hits never touch the network. On a miss the service is
    /// queried; a body without usable `"loc"` components is a successful
    /// lookup with unknown coordinates (and is cached as such), while
    /// transport errors and error statuses bubble up for the caller's
    /// retry policy.
    pub async fn locate(&self, ip: IpAddr) -> Result<Coordinates> {
        if let Some(hit) = self.cache.get(&ip) {
            return Ok(hit);
        }

        let url = match &self.token {
            Some(token) => format!("{}/{}/json?token={}", self.api_base, ip, token),
            None => format!("{}/{}/json", self.api_base, ip),
        };

        let response = self.client.get(&url).timeout(self.timeout).send().await?;
        if !response.status().is_success() {
            return Err(GeoError::ApiStatus(response.status()));
        }

        let body: GeoResponse = response.json().await?;
        let coordinates = parse_loc(body.loc.as_deref());

        self.cache.insert(ip, coordinates.clone());
        Ok(coordinates)
    }

    /// Pre-populate the cache for an address.
    pub fn seed(&self, ip: IpAddr, coordinates: Coordinates) {
        self.cache.insert(ip, coordinates);
    }

    /// Number of cached addresses.
    pub fn cached_addresses(&self) -> usize {
        self.cache.len()
    }
}

/// Split a `"lat,lon"` field into components, unknown where missing/empty.
fn parse_loc(loc: Option<&str>) -> Coordinates {
    let mut parts = loc.unwrap_or_default().splitn(2, ',');
    let latitude = parts.next().unwrap_or_default().trim();
    let longitude = parts.next().unwrap_or_default().trim();

    Coordinates {
        latitude: if latitude.is_empty() {
            UNKNOWN.to_string()
        } else {
            latitude.to_string()
        },
        longitude: if longitude.is_empty() {
            UNKNOWN.to_string()
        } else {
            longitude.to_string()
        },
    }
}

/// Builder for configuring a [`GeoLocator`]
#[derive(Debug)]
pub struct GeoLocatorBuilder {
    client: Option<reqwest::Client>,
    api_base: String,
    token: Option<String>,
    timeout: Duration,
}

impl Default for GeoLocatorBuilder {
    fn default() -> Self {
        Self {
            client: None,
            api_base: DEFAULT_API_BASE.to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl GeoLocatorBuilder {
    /// Share an existing HTTP connection pool
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the API base URL (primarily for tests)
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set the static access token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = if token.is_empty() { None } else { Some(token) };
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the client
    pub fn build(self) -> GeoLocator {
        GeoLocator {
            client: self.client.unwrap_or_default(),
            api_base: self.api_base.trim_end_matches('/').to_string(),
            token: self.token,
            timeout: self.timeout,
            cache: LookupCache::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn locator_for(server: &MockServer) -> GeoLocator {
        GeoLocator::builder()
            .api_base(server.uri())
            .token("test-token")
            .timeout(Duration::from_secs(2))
            .build()
    }

    #[test]
    fn test_parse_loc() {
        let coords = parse_loc(Some("12.34,56.78"));
        assert_eq!(coords.latitude, "12.34");
        assert_eq!(coords.longitude, "56.78");
        assert!(coords.is_known());

        assert_eq!(parse_loc(None), Coordinates::unknown());
        assert_eq!(parse_loc(Some("")), Coordinates::unknown());

        let lat_only = parse_loc(Some("12.34,"));
        assert_eq!(lat_only.latitude, "12.34");
        assert_eq!(lat_only.longitude, UNKNOWN);
        assert!(!lat_only.is_known());
    }

    #[tokio::test]
    async fn test_locate_parses_loc_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/203.0.113.9/json"))
            .and(query_param("token", "test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"loc": "12.34,56.78", "city": "Paris"})),
            )
            .mount(&server)
            .await;

        let locator = locator_for(&server);
        let coords = locator.locate("203.0.113.9".parse().unwrap()).await.unwrap();
        assert_eq!(coords.latitude, "12.34");
        assert_eq!(coords.longitude, "56.78");
        // Coordinates must stay numeric-parseable tokens
        assert!(coords.latitude.parse::<f64>().is_ok());
        assert!(coords.longitude.parse::<f64>().is_ok());
    }

    #[tokio::test]
    async fn test_missing_loc_is_unknown_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"city": "Paris"})))
            .mount(&server)
            .await;

        let locator = locator_for(&server);
        let coords = locator.locate("203.0.113.9".parse().unwrap()).await.unwrap();
        assert_eq!(coords, Coordinates::unknown());
    }

    #[tokio::test]
    async fn test_error_status_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let locator = locator_for(&server);
        let result = locator.locate("203.0.113.9".parse().unwrap()).await;
        assert!(matches!(result, Err(GeoError::ApiStatus(_))));
    }

    #[tokio::test]
    async fn test_cache_hit_issues_no_request() {
        let server = MockServer::start().await;
        // The mock rejects every call: a cache hit must never reach it
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let locator = locator_for(&server);
        let ip: IpAddr = "203.0.113.9".parse().unwrap();
        locator.seed(
            ip,
            Coordinates {
                latitude: "1.0".to_string(),
                longitude: "2.0".to_string(),
            },
        );

        let coords = locator.locate(ip).await.unwrap();
        assert_eq!(coords.latitude, "1.0");
        assert_eq!(coords.longitude, "2.0");
        // MockServer verifies expect(0) on drop
    }

    #[tokio::test]
    async fn test_second_lookup_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"loc": "12.34,56.78"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let locator = locator_for(&server);
        let ip: IpAddr = "203.0.113.9".parse().unwrap();
        let first = locator.locate(ip).await.unwrap();
        let second = locator.locate(ip).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(locator.cached_addresses(), 1);
    }
}
