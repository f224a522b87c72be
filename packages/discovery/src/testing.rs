//! Testing utilities including mock implementations.
//!
//! Useful for exercising discovery sessions without network calls: providers
//! record every call for assertions and answer from scripted data.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use crate::clock::Clock;
use crate::directory::UserDirectory;
use crate::error::{DirectoryError, DirectoryResult, GeocodeError, GeocodeResult};
use crate::geocoding::{Geocoder, GeocodeMatch};
use crate::types::{
    query::{DiscoverQuery, DiscoverResult},
    user::{DiscoveredUser, UserRole, UserSummary},
};

// =============================================================================
// Clock
// =============================================================================

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap())
    }
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock().unwrap() += by;
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// =============================================================================
// Geocoder
// =============================================================================

/// A mock geocoding provider.
///
/// Unknown place names return no matches; names registered with
/// [`failing_for`](Self::failing_for) return an error.
#[derive(Default)]
pub struct MockGeocoder {
    matches: RwLock<HashMap<String, Vec<GeocodeMatch>>>,
    failing: RwLock<HashSet<String>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `place` with one match.
    pub fn with_match(self, place: impl Into<String>, lat: &str, lon: &str) -> Self {
        self.matches
            .write()
            .unwrap()
            .entry(place.into())
            .or_default()
            .push(GeocodeMatch::new(lat, lon));
        self
    }

    /// Fail every lookup of `place`.
    pub fn failing_for(self, place: impl Into<String>) -> Self {
        self.failing.write().unwrap().insert(place.into());
        self
    }

    /// Queries received, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn lookup(&self, query: &str, limit: usize) -> GeocodeResult<Vec<GeocodeMatch>> {
        self.calls.write().unwrap().push(query.to_string());

        if self.failing.read().unwrap().contains(query) {
            return Err(GeocodeError::Status { status: 503 });
        }

        let mut matches = self
            .matches
            .read()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default();
        matches.truncate(limit);
        Ok(matches)
    }
}

// =============================================================================
// Directory
// =============================================================================

type Responder = Box<dyn Fn(&DiscoverQuery) -> DirectoryResult<DiscoverResult> + Send + Sync>;

/// A mock user directory.
///
/// Answers from, in order of precedence: queued one-shot responses, the
/// responder closure, an empty page.
#[derive(Default)]
pub struct MockDirectory {
    queued: Mutex<VecDeque<Result<DiscoverResult, String>>>,
    responder: Option<Responder>,
    latency: Option<Duration>,
    queries: Arc<RwLock<Vec<DiscoverQuery>>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute every response from the query.
    pub fn with_responder(
        mut self,
        responder: impl Fn(&DiscoverQuery) -> DirectoryResult<DiscoverResult> + Send + Sync + 'static,
    ) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Queue a one-shot page.
    pub fn with_page(self, users: Vec<DiscoveredUser>, has_more: bool) -> Self {
        let total = users.len();
        self.queued.lock().unwrap().push_back(Ok(DiscoverResult {
            users,
            total,
            has_more,
        }));
        self
    }

    /// Queue a one-shot failure.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.queued.lock().unwrap().push_back(Err(message.into()));
        self
    }

    /// Sleep this long inside every call (use with a paused tokio clock).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queries received, in order.
    pub fn queries(&self) -> Vec<DiscoverQuery> {
        self.queries.read().unwrap().clone()
    }

    /// Radius of every query received, in order.
    pub fn radii(&self) -> Vec<Option<u32>> {
        self.queries().iter().map(|q| q.radius_km()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.queries.read().unwrap().len()
    }
}

#[async_trait]
impl UserDirectory for MockDirectory {
    async fn discover(&self, query: &DiscoverQuery) -> DirectoryResult<DiscoverResult> {
        self.queries.write().unwrap().push(query.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let queued = self.queued.lock().unwrap().pop_front();
        match queued {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(DirectoryError::Rejected {
                status: 500,
                message,
            }),
            None => match &self.responder {
                Some(responder) => responder(query),
                None => Ok(DiscoverResult::empty()),
            },
        }
    }
}

/// `count` distinct users with uids `{prefix}-{n}`.
pub fn fake_users(prefix: &str, count: usize) -> Vec<DiscoveredUser> {
    (0..count)
        .map(|n| {
            DiscoveredUser::new(
                UserSummary::new(format!("{prefix}-{n}"), UserRole::Receiver)
                    .with_display_name(format!("User {n}")),
            )
        })
        .collect()
}
