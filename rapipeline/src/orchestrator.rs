//! Per-station enrichment orchestration.

use std::time::Duration;

use tracing::{debug, info};

use rageo::{CountryResolver, GeoLocator};
use raprobe::{retry, IcyProber, LivenessProber, MediaProber, RetryPolicy};
use rastation::{StationInput, StationRecord};

/// Retry policies, one per transient probe category.
///
/// DNS resolution is deliberately absent: a resolution failure is permanent
/// for the station's run.
#[derive(Debug, Clone, Copy)]
pub struct RetrySet {
    pub liveness: RetryPolicy,
    pub geolocation: RetryPolicy,
    pub media: RetryPolicy,
    pub icy: RetryPolicy,
}

impl Default for RetrySet {
    fn default() -> Self {
        Self {
            liveness: RetryPolicy::new(3),
            geolocation: RetryPolicy::new(3),
            media: RetryPolicy::new(2),
            icy: RetryPolicy::new(2),
        }
    }
}

impl RetrySet {
    /// Same attempt counts with a shorter backoff, for tests.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.liveness = self.liveness.with_base_delay(base_delay);
        self.geolocation = self.geolocation.with_base_delay(base_delay);
        self.media = self.media.with_base_delay(base_delay);
        self.icy = self.icy.with_base_delay(base_delay);
        self
    }
}

/// Runs the probe sequence for one station and assembles the record.
///
/// The sequence is strict per station: liveness, then resolution,
/// geolocation, reverse geocoding, the media probe and the ICY probe. An
/// unavailable station short-circuits with every field unknown. After that,
/// each step runs regardless of whether the previous one produced anything
/// — a failed geolocation must not cost the station its codec metadata.
/// No probe failure escapes this type; everything degrades to the
/// `"unknown"` sentinel.
pub struct Orchestrator {
    liveness: LivenessProber,
    media: MediaProber,
    icy: IcyProber,
    geo: GeoLocator,
    countries: CountryResolver,
    retries: RetrySet,
}

impl Orchestrator {
    pub fn new(
        liveness: LivenessProber,
        media: MediaProber,
        icy: IcyProber,
        geo: GeoLocator,
        countries: CountryResolver,
    ) -> Self {
        Self {
            liveness,
            media,
            icy,
            geo,
            countries,
            retries: RetrySet::default(),
        }
    }

    /// Override the retry policies.
    pub fn with_retries(mut self, retries: RetrySet) -> Self {
        self.retries = retries;
        self
    }

    /// Enrich one claimed station into its output record.
    pub async fn enrich(&self, station: &StationInput) -> StationRecord {
        let mut record = StationRecord::unavailable(&station.name, &station.url);

        let what = format!("liveness probe for {}", station.url);
        record.available = retry(&self.retries.liveness, &what, || {
            self.liveness.check(&station.url)
        })
        .await
        .unwrap_or(false);

        if !record.available {
            info!("Station unavailable: {} ({})", station.name, station.url);
            return record;
        }

        // Resolution is permanent-per-station: one shot, no retry.
        match raprobe::resolve_host(&station.url).await {
            Ok(ip) => {
                let what = format!("geolocation for {ip}");
                if let Some(coordinates) =
                    retry(&self.retries.geolocation, &what, || self.geo.locate(ip)).await
                {
                    record.latitude = coordinates.latitude;
                    record.longitude = coordinates.longitude;
                }
            }
            Err(e) => debug!("Resolution failed for {}: {e}", station.url),
        }

        // Skips itself when either coordinate is unknown; never fails.
        let country = self
            .countries
            .resolve(&record.latitude, &record.longitude)
            .await;
        record.country = country.name;
        record.country_code = country.code;

        let what = format!("media probe for {}", station.url);
        if let Some(audio) =
            retry(&self.retries.media, &what, || self.media.probe(&station.url)).await
        {
            record.codec = audio.codec;
            record.sample_rate = audio.sample_rate;
            record.bitrate = audio.bitrate;
            record.channels = audio.channels;
            record.channel_layout = audio.channel_layout;
        }

        let what = format!("ICY probe for {}", station.url);
        if let Some(tags) =
            retry(&self.retries.icy, &what, || self.icy.probe(&station.url)).await
        {
            record.icy = tags;
        }

        debug!("Enriched {} ({})", station.name, station.url);
        record
    }
}
