//! Rate-limited geocoder wrapper using the governor crate.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use super::{Geocoder, GeocodeMatch};
use crate::error::GeocodeResult;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A geocoder wrapper that waits for a permit before every lookup.
pub struct RateLimitedGeocoder<G: Geocoder> {
    inner: G,
    limiter: Arc<DefaultRateLimiter>,
}

impl<G: Geocoder> RateLimitedGeocoder<G> {
    /// Allow `requests_per_second` lookups per second (no burst).
    pub fn new(geocoder: G, requests_per_second: NonZeroU32) -> Self {
        Self::with_quota(geocoder, Quota::per_second(requests_per_second))
    }

    /// Create with a custom quota.
    pub fn with_quota(geocoder: G, quota: Quota) -> Self {
        Self {
            inner: geocoder,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

#[async_trait]
impl<G: Geocoder> Geocoder for RateLimitedGeocoder<G> {
    async fn lookup(&self, query: &str, limit: usize) -> GeocodeResult<Vec<GeocodeMatch>> {
        self.limiter.until_ready().await;
        self.inner.lookup(query, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGeocoder;

    #[tokio::test]
    async fn test_delegates_to_inner() {
        let mock = MockGeocoder::new().with_match("Utrecht", "52.09", "5.12");
        let geocoder = RateLimitedGeocoder::new(mock, NonZeroU32::new(5).unwrap());

        let matches = geocoder.lookup("Utrecht", 1).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(geocoder.inner.calls(), vec!["Utrecht".to_string()]);
    }
}
