use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, instrument, warn};

use super::Geocoder;
use crate::clock::{Clock, SystemClock};
use crate::types::geo::GeoCoordinates;

/// A memoized lookup. `coordinates: None` is a cached miss.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeCacheEntry {
    pub place_name: String,
    pub coordinates: Option<GeoCoordinates>,
    pub resolved_at: DateTime<Utc>,
}

impl GeocodeCacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        now - self.resolved_at <= ttl
    }
}

/// Best-effort place name → coordinates resolution with a TTL cache.
///
/// Keys are exact, case-sensitive place names (callers trim). Misses and
/// provider failures are cached as `None` so a failing name is not retried
/// until the entry goes stale.
///
/// There is no in-flight deduplication: two concurrent lookups of the same
/// uncached name both reach the provider and the later insert wins. Lookups
/// are idempotent, so this only costs an extra request.
pub struct GeocodeCache {
    provider: Arc<dyn Geocoder>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
    entries: RwLock<HashMap<String, GeocodeCacheEntry>>,
}

impl GeocodeCache {
    /// Cache with a 24h TTL on the system clock.
    pub fn new(provider: Arc<dyn Geocoder>) -> Self {
        Self {
            provider,
            clock: Arc::new(SystemClock),
            ttl: TimeDelta::hours(24),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Resolve `place_name`, consulting the provider only when no fresh entry exists.
    ///
    /// Never fails: provider errors resolve to `None`.
    #[instrument(skip(self))]
    pub async fn resolve(&self, place_name: &str) -> Option<GeoCoordinates> {
        if let Some(entry) = self.fresh_entry(place_name) {
            debug!(hit = entry.coordinates.is_some(), "Geocode cache hit");
            return entry.coordinates;
        }

        let coordinates = match self.provider.lookup(place_name, 1).await {
            Ok(matches) => match matches.first() {
                Some(first) => match first.coordinates() {
                    Ok(coordinates) => Some(coordinates),
                    Err(e) => {
                        warn!(error = %e, "Discarding unparseable geocoding match");
                        None
                    }
                },
                None => {
                    warn!("Location not found by geocoding provider");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "Geocoding lookup failed");
                None
            }
        };

        let entry = GeocodeCacheEntry {
            place_name: place_name.to_string(),
            coordinates,
            resolved_at: self.clock.now(),
        };
        self.entries
            .write()
            .unwrap()
            .insert(place_name.to_string(), entry);

        coordinates
    }

    /// Inspect the stored entry for `place_name`, fresh or not.
    pub fn entry(&self, place_name: &str) -> Option<GeocodeCacheEntry> {
        self.entries.read().unwrap().get(place_name).cloned()
    }

    /// Number of distinct place names looked up so far.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fresh_entry(&self, place_name: &str) -> Option<GeocodeCacheEntry> {
        let now = self.clock.now();
        self.entries
            .read()
            .unwrap()
            .get(place_name)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ManualClock, MockGeocoder};

    fn cache_with(mock: Arc<MockGeocoder>, clock: Arc<ManualClock>) -> GeocodeCache {
        GeocodeCache::new(mock).with_clock(clock)
    }

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let mock = Arc::new(MockGeocoder::new().with_match("Amsterdam", "52.37", "4.90"));
        let clock = Arc::new(ManualClock::default());
        let cache = cache_with(mock.clone(), clock.clone());

        let first = cache.resolve("Amsterdam").await;
        clock.advance(TimeDelta::hours(23));
        let second = cache.resolve("Amsterdam").await;

        assert_eq!(first, Some(GeoCoordinates::new(52.37, 4.90)));
        assert_eq!(first, second);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_misses_are_cached() {
        let mock = Arc::new(MockGeocoder::new());
        let clock = Arc::new(ManualClock::default());
        let cache = cache_with(mock.clone(), clock.clone());

        assert_eq!(cache.resolve("Atlantis").await, None);
        assert_eq!(cache.resolve("Atlantis").await, None);
        assert_eq!(mock.call_count(), 1);

        let entry = cache.entry("Atlantis").unwrap();
        assert_eq!(entry.coordinates, None);
        assert_eq!(entry.resolved_at, clock.now());
    }

    #[tokio::test]
    async fn test_provider_errors_are_swallowed_and_cached() {
        let mock = Arc::new(MockGeocoder::new().failing_for("Utrecht"));
        let cache = cache_with(mock.clone(), Arc::new(ManualClock::default()));

        assert_eq!(cache.resolve("Utrecht").await, None);
        assert_eq!(cache.resolve("Utrecht").await, None);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_match_is_a_miss() {
        let mock = Arc::new(MockGeocoder::new().with_match("Gouda", "n/a", "4.71"));
        let cache = cache_with(mock, Arc::new(ManualClock::default()));

        assert_eq!(cache.resolve("Gouda").await, None);
        assert_eq!(cache.entry("Gouda").unwrap().coordinates, None);
    }

    #[tokio::test]
    async fn test_keys_are_case_sensitive() {
        let mock = Arc::new(MockGeocoder::new().with_match("Leiden", "52.16", "4.49"));
        let cache = cache_with(mock.clone(), Arc::new(ManualClock::default()));

        assert!(cache.resolve("Leiden").await.is_some());
        assert!(cache.resolve("leiden").await.is_none());
        assert_eq!(mock.call_count(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_entry_at_exactly_ttl_is_fresh() {
        let mock = Arc::new(MockGeocoder::new().with_match("Delft", "52.01", "4.36"));
        let clock = Arc::new(ManualClock::default());
        let cache = cache_with(mock.clone(), clock.clone());

        cache.resolve("Delft").await;
        clock.advance(TimeDelta::hours(24));
        cache.resolve("Delft").await;
        assert_eq!(mock.call_count(), 1);

        clock.advance(TimeDelta::seconds(1));
        cache.resolve("Delft").await;
        assert_eq!(mock.call_count(), 2);
    }
}
