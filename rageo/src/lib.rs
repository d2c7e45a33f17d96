//! # RadioAtlas Geolocation
//!
//! Maps resolved stream addresses to approximate coordinates and those
//! coordinates to a country:
//! - [`GeoLocator`]: token-keyed IP-geolocation HTTP client with a
//!   per-address cache
//! - [`CountryResolver`]: reverse geocoding through a blocking
//!   [`ReverseGeocode`] client, offloaded to a worker thread, with a
//!   per-coordinate cache
//!
//! Both caches live for the process, are never evicted, and are guarded by
//! their own lock held only for the check-or-insert — never across an
//! await. They are plain objects constructed once and passed by reference
//! into every station task; there are no process-wide singletons.
//!
//! Geolocation failures propagate as [`GeoError`] so the caller's retry
//! policy can have another go; reverse geocoding never fails — any error
//! degrades to the `"unknown"` country.

pub mod cache;
pub mod client;
pub mod error;
pub mod geocoder;

pub use cache::LookupCache;
pub use client::{Coordinates, GeoLocator, GeoLocatorBuilder};
pub use error::{GeoError, Result};
pub use geocoder::{Country, CountryResolver, GeocodedAddress, NominatimClient, ReverseGeocode};
