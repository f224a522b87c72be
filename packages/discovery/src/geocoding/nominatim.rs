use async_trait::async_trait;
use tracing::{debug, error, instrument};

use super::{Geocoder, GeocodeMatch};
use crate::config::GeocodingConfig;
use crate::error::{GeocodeError, GeocodeResult};

/// Geocoder using the Nominatim (OpenStreetMap) search API
///
/// Nominatim's usage policy allows at most one request per second; wrap this
/// in a [`RateLimitedGeocoder`](super::RateLimitedGeocoder) when sharing the
/// public instance.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    config: GeocodingConfig,
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new(GeocodingConfig::default())
    }
}

impl NominatimGeocoder {
    pub fn new(config: GeocodingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn search_url(&self, query: &str, limit: usize) -> String {
        format!(
            "{}/search?q={}&format=json&limit={}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(query),
            limit
        )
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self))]
    async fn lookup(&self, query: &str, limit: usize) -> GeocodeResult<Vec<GeocodeMatch>> {
        let url = self.search_url(query, limit);
        debug!("Geocoding location: {}", query);

        let response = self
            .client
            .get(&url)
            .header("User-Agent", &self.config.user_agent)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, query = %query, "Geocoding API request failed");
                GeocodeError::Http(Box::new(e))
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, query = %query, "Geocoding API returned an error");
            return Err(GeocodeError::Status {
                status: status.as_u16(),
            });
        }

        let matches: Vec<GeocodeMatch> = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse geocoding response");
            GeocodeError::Http(Box::new(e))
        })?;

        debug!("Geocoded {} → {} match(es)", query, matches.len());
        Ok(matches)
    }
}
