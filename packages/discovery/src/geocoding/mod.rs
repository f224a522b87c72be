//! Place-name geocoding.
//!
//! [`GeocodeCache`] sits in front of any [`Geocoder`] provider and memoizes
//! results (including misses) for the configured TTL. Providers:
//! - [`NominatimGeocoder`] - OpenStreetMap search API
//! - [`RateLimitedGeocoder`] - wraps a provider with a request quota

mod cache;
mod nominatim;
mod rate_limited;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{GeocodeError, GeocodeResult};
use crate::types::geo::GeoCoordinates;

pub use cache::{GeocodeCache, GeocodeCacheEntry};
pub use nominatim::NominatimGeocoder;
pub use rate_limited::RateLimitedGeocoder;

/// One provider match, in the provider's wire format (coordinates as strings)
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeMatch {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl GeocodeMatch {
    pub fn new(lat: impl Into<String>, lon: impl Into<String>) -> Self {
        Self {
            lat: lat.into(),
            lon: lon.into(),
            display_name: None,
        }
    }

    /// Parse the match's latitude/longitude.
    pub fn coordinates(&self) -> GeocodeResult<GeoCoordinates> {
        let parse = |value: &str| {
            value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| GeocodeError::InvalidCoordinate {
                    value: value.to_string(),
                })
        };

        Ok(GeoCoordinates {
            lat: parse(&self.lat)?,
            lng: parse(&self.lon)?,
        })
    }
}

/// External place-name lookup.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Look up `query`, returning at most `limit` matches (best first).
    async fn lookup(&self, query: &str, limit: usize) -> GeocodeResult<Vec<GeocodeMatch>>;
}
