//! Reverse geocoding: coordinates → country.
//!
//! The geocoding client is blocking-only, so [`CountryResolver`] runs it on
//! a worker thread via `spawn_blocking` — sibling stations keep making
//! progress while one waits on the geocoder. Reverse geocoding is a
//! best-effort enrichment: it never returns an error, only a (possibly
//! unknown) [`Country`].

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};
use ureq::Agent;

use rastation::{or_unknown, UNKNOWN};

use crate::cache::LookupCache;
use crate::error::Result;

/// Default reverse-geocoding API base URL
pub const DEFAULT_API_BASE: &str = "https://nominatim.openstreetmap.org";

/// Default timeout for reverse-geocoding requests (10 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Country name and code for one coordinate pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country {
    pub name: String,
    pub code: String,
}

impl Country {
    /// Both fields unknown.
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN.to_string(),
            code: UNKNOWN.to_string(),
        }
    }

    pub fn is_known(&self) -> bool {
        self.name != UNKNOWN || self.code != UNKNOWN
    }
}

/// Structured address returned by a reverse geocoder.
#[derive(Debug, Clone, Default)]
pub struct GeocodedAddress {
    pub country: Option<String>,
    pub country_code: Option<String>,
}

/// A blocking reverse-geocoding service.
///
/// Implemented by [`NominatimClient`]; tests substitute counting fakes to
/// assert the geocoder is never reached for unknown coordinates.
pub trait ReverseGeocode: Send + Sync {
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<GeocodedAddress>;
}

// ============================================================================
// NominatimClient
// ============================================================================

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    #[serde(default)]
    address: NominatimAddress,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    country: Option<String>,
    country_code: Option<String>,
}

/// Nominatim-compatible reverse geocoder over a blocking HTTP agent.
#[derive(Clone)]
pub struct NominatimClient {
    agent: Agent,
    api_base: String,
    user_agent: String,
}

impl NominatimClient {
    /// Create a client for the given API base.
    ///
    /// Nominatim's usage policy requires an identifying User-Agent, so it
    /// is sent with every request.
    pub fn new(
        api_base: impl Into<String>,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();

        let api_base: String = api_base.into();
        Self {
            agent: config.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
        }
    }
}

impl ReverseGeocode for NominatimClient {
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<GeocodedAddress> {
        let url = format!(
            "{}/reverse?lat={}&lon={}&format=jsonv2&accept-language=en",
            self.api_base, latitude, longitude
        );

        let response = self
            .agent
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .call()?;

        // response: http::Response<ureq::Body>
        let (_parts, body) = response.into_parts();
        let parsed: NominatimResponse = serde_json::from_reader(body.into_reader())?;

        Ok(GeocodedAddress {
            country: parsed.address.country,
            country_code: parsed.address.country_code,
        })
    }
}

// ============================================================================
// CountryResolver
// ============================================================================

/// Cached coordinates→country resolution over a blocking geocoder.
pub struct CountryResolver {
    geocoder: Arc<dyn ReverseGeocode>,
    cache: LookupCache<(String, String), Country>,
}

impl CountryResolver {
    pub fn new(geocoder: Arc<dyn ReverseGeocode>) -> Self {
        Self {
            geocoder,
            cache: LookupCache::new(),
        }
    }

    /// Resolve a coordinate pair to a country.
    ///
    /// Skipped outright when either component is unknown — the geocoder is
    /// not contacted at all. Failures of any kind (parse, transport, the
    /// service's own rate-limit signal, a lost worker) degrade to
    /// [`Country::unknown`]; only successful lookups enter the cache.
    pub async fn resolve(&self, latitude: &str, longitude: &str) -> Country {
        if latitude == UNKNOWN || longitude == UNKNOWN {
            return Country::unknown();
        }

        let key = (latitude.to_string(), longitude.to_string());
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }

        let (lat, lon) = match (latitude.parse::<f64>(), longitude.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => (lat, lon),
            _ => {
                debug!("Unparseable coordinates ({latitude}, {longitude}), skipping geocoder");
                return Country::unknown();
            }
        };

        // The client is blocking-only: run it off the async pool so
        // sibling stations are not stalled behind this lookup.
        let geocoder = Arc::clone(&self.geocoder);
        match tokio::task::spawn_blocking(move || geocoder.reverse(lat, lon)).await {
            Ok(Ok(address)) => {
                let country = Country {
                    name: or_unknown(address.country),
                    code: or_unknown(address.country_code),
                };
                self.cache.insert(key, country.clone());
                country
            }
            Ok(Err(e)) => {
                warn!("Reverse geocoding failed for ({latitude}, {longitude}): {e}");
                Country::unknown()
            }
            Err(e) => {
                warn!("Reverse geocoding worker failed: {e}");
                Country::unknown()
            }
        }
    }

    /// Number of cached coordinate pairs.
    pub fn cached_pairs(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Geocoder fake that counts how often it is reached.
    struct CountingGeocoder {
        calls: AtomicUsize,
        result: GeocodedAddress,
    }

    impl CountingGeocoder {
        fn new(result: GeocodedAddress) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                result,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ReverseGeocode for CountingGeocoder {
        fn reverse(&self, _latitude: f64, _longitude: f64) -> Result<GeocodedAddress> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result.clone())
        }
    }

    struct FailingGeocoder;

    impl ReverseGeocode for FailingGeocoder {
        fn reverse(&self, _latitude: f64, _longitude: f64) -> Result<GeocodedAddress> {
            Err(crate::GeoError::Io(std::io::Error::other("service down")))
        }
    }

    fn french_address() -> GeocodedAddress {
        GeocodedAddress {
            country: Some("France".to_string()),
            country_code: Some("fr".to_string()),
        }
    }

    #[tokio::test]
    async fn test_resolves_country() {
        let geocoder = CountingGeocoder::new(french_address());
        let resolver = CountryResolver::new(geocoder.clone());

        let country = resolver.resolve("48.8566", "2.3522").await;
        assert_eq!(country.name, "France");
        assert_eq!(country.code, "fr");
        assert_eq!(geocoder.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_coordinates_skip_geocoder() {
        let geocoder = CountingGeocoder::new(french_address());
        let resolver = CountryResolver::new(geocoder.clone());

        assert_eq!(resolver.resolve(UNKNOWN, "2.3522").await, Country::unknown());
        assert_eq!(resolver.resolve("48.8566", UNKNOWN).await, Country::unknown());
        assert_eq!(resolver.resolve(UNKNOWN, UNKNOWN).await, Country::unknown());
        assert_eq!(geocoder.calls(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_coordinates_skip_geocoder() {
        let geocoder = CountingGeocoder::new(french_address());
        let resolver = CountryResolver::new(geocoder.clone());

        assert_eq!(
            resolver.resolve("not-a-number", "2.3522").await,
            Country::unknown()
        );
        assert_eq!(geocoder.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_geocoder() {
        let geocoder = CountingGeocoder::new(french_address());
        let resolver = CountryResolver::new(geocoder.clone());

        let first = resolver.resolve("48.8566", "2.3522").await;
        let second = resolver.resolve("48.8566", "2.3522").await;
        assert_eq!(first, second);
        assert_eq!(geocoder.calls(), 1);
        assert_eq!(resolver.cached_pairs(), 1);
    }

    #[tokio::test]
    async fn test_failure_degrades_to_unknown_and_is_not_cached() {
        let resolver = CountryResolver::new(Arc::new(FailingGeocoder));

        let country = resolver.resolve("48.8566", "2.3522").await;
        assert_eq!(country, Country::unknown());
        assert_eq!(resolver.cached_pairs(), 0);
    }

    #[tokio::test]
    async fn test_partial_address_fills_unknown() {
        let geocoder = CountingGeocoder::new(GeocodedAddress {
            country: Some("France".to_string()),
            country_code: None,
        });
        let resolver = CountryResolver::new(geocoder);

        let country = resolver.resolve("48.8566", "2.3522").await;
        assert_eq!(country.name, "France");
        assert_eq!(country.code, UNKNOWN);
    }
}
