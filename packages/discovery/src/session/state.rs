//! Session state and its transitions.
//!
//! Pure data: no I/O happens here. The orchestrator drives these transitions
//! around directory calls and publishes a [`SessionSnapshot`] after each one.

use serde::Serialize;

use crate::config::DiscoveryConfig;
use crate::types::{
    filters::SearchFilters,
    geo::HomeLocation,
    query::{DiscoverQuery, DiscoverResult},
    user::DiscoveredUser,
};

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    /// No search yet (or reset)
    Idle,
    /// First page of a new filter set in flight
    Searching,
    /// Automatic wider-radius re-query pending or in flight
    Expanding,
    /// Latest query finished; results are current (possibly empty)
    Ready,
    /// "Load more" page in flight
    LoadingMore,
}

impl SessionPhase {
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            SessionPhase::Searching | SessionPhase::Expanding | SessionPhase::LoadingMore
        )
    }
}

/// Read-only view of a session, published to observers after every change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub generation: u64,
    pub phase: SessionPhase,
    pub home_location: Option<HomeLocation>,
    pub filters: SearchFilters,
    pub current_radius_km: u32,
    pub results: Vec<DiscoveredUser>,
    pub page_offset: usize,
    pub expansion_attempt: u32,
    pub is_expanding: bool,
    pub has_more: bool,
    pub total: usize,
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    pub fn is_loading(&self) -> bool {
        self.phase.is_in_flight()
    }
}

/// Mutable state of one discovery session
///
/// Invariant: `accumulated_results.len() == page_offset` whenever no fetch
/// is in flight.
#[derive(Debug, Clone)]
pub(crate) struct SearchSession {
    pub(crate) generation: u64,
    pub(crate) phase: SessionPhase,
    pub(crate) home_location: Option<HomeLocation>,
    pub(crate) filters: SearchFilters,
    pub(crate) current_radius_km: u32,
    pub(crate) accumulated_results: Vec<DiscoveredUser>,
    pub(crate) page_offset: usize,
    pub(crate) expansion_attempt: u32,
    pub(crate) is_expanding: bool,
    pub(crate) has_more: bool,
    pub(crate) total: usize,
    pub(crate) last_error: Option<String>,
}

impl SearchSession {
    pub(crate) fn new(initial_radius_km: u32) -> Self {
        Self {
            generation: 0,
            phase: SessionPhase::Idle,
            home_location: None,
            filters: SearchFilters::default(),
            current_radius_km: initial_radius_km,
            accumulated_results: Vec::new(),
            page_offset: 0,
            expansion_attempt: 0,
            is_expanding: false,
            has_more: false,
            total: 0,
            last_error: None,
        }
    }

    /// Set once; later calls are ignored. Returns whether it was set.
    pub(crate) fn set_home_location(&mut self, home: HomeLocation) -> bool {
        if self.home_location.is_some() {
            return false;
        }
        self.home_location = Some(home);
        true
    }

    /// Start a new search sequence, invalidating anything in flight.
    pub(crate) fn begin_search(&mut self, filters: SearchFilters, initial_radius_km: u32) -> u64 {
        let radius = filters.max_distance_km.unwrap_or(initial_radius_km);

        self.generation += 1;
        self.phase = SessionPhase::Searching;
        self.filters = filters;
        self.current_radius_km = radius;
        self.accumulated_results.clear();
        self.page_offset = 0;
        self.expansion_attempt = 0;
        self.is_expanding = false;
        self.has_more = false;
        self.total = 0;
        self.last_error = None;

        self.generation
    }

    /// Back to `Idle`, invalidating anything in flight. Home location is kept.
    pub(crate) fn reset(&mut self, initial_radius_km: u32) {
        let generation = self.generation + 1;
        let home_location = self.home_location.take();

        *self = Self::new(initial_radius_km);
        self.generation = generation;
        self.home_location = home_location;
    }

    /// Claim the session for a "load more" fetch.
    ///
    /// Returns `None` (and changes nothing) unless the session is `Ready`
    /// with more pages available.
    pub(crate) fn begin_load_more(&mut self, page_size: usize) -> Option<(u64, DiscoverQuery)> {
        if self.phase != SessionPhase::Ready || !self.has_more {
            return None;
        }
        self.phase = SessionPhase::LoadingMore;
        self.last_error = None;
        Some((self.generation, self.query(self.page_offset, page_size)))
    }

    pub(crate) fn query(&self, offset: usize, page_size: usize) -> DiscoverQuery {
        DiscoverQuery {
            home_location: self.home_location.clone(),
            filters: self.filters.with_max_distance_km(self.current_radius_km),
            limit: page_size,
            offset,
        }
    }

    /// Replace results with a first page.
    pub(crate) fn apply_first_page(&mut self, page: DiscoverResult) {
        self.page_offset = page.users.len();
        self.accumulated_results = page.users;
        self.has_more = page.has_more;
        self.total = page.total;
    }

    /// Append a continuation page.
    pub(crate) fn apply_next_page(&mut self, page: DiscoverResult) {
        self.page_offset += page.users.len();
        self.accumulated_results.extend(page.users);
        self.has_more = page.has_more;
        self.total = page.total;
        self.settle();
    }

    /// Radius of the next automatic re-query, if one is allowed.
    ///
    /// Candidate is `initial_distance_km + attempt * step` using the attempt
    /// count before it is incremented, and must not exceed the configured cap.
    /// The queried radius never shrinks below the current one.
    pub(crate) fn next_expansion_radius(&self, config: &DiscoveryConfig) -> Option<u32> {
        if !config.auto_expand || self.expansion_attempt >= config.max_expansion_attempts {
            return None;
        }

        let candidate = config
            .initial_distance_km
            .saturating_add(self.expansion_attempt.saturating_mul(config.expansion_step_km));
        (candidate <= config.max_distance_km).then_some(candidate)
    }

    pub(crate) fn begin_expansion(&mut self, radius_km: u32) {
        self.expansion_attempt += 1;
        self.current_radius_km = self.current_radius_km.max(radius_km);
        self.is_expanding = true;
        self.phase = SessionPhase::Expanding;
    }

    pub(crate) fn settle(&mut self) {
        self.is_expanding = false;
        self.phase = SessionPhase::Ready;
    }

    /// Record a failed fetch without touching accumulated results.
    pub(crate) fn fail(&mut self, message: String) {
        self.last_error = Some(message);
        self.settle();
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            generation: self.generation,
            phase: self.phase,
            home_location: self.home_location.clone(),
            filters: self.filters.clone(),
            current_radius_km: self.current_radius_km,
            results: self.accumulated_results.clone(),
            page_offset: self.page_offset,
            expansion_attempt: self.expansion_attempt,
            is_expanding: self.is_expanding,
            has_more: self.has_more,
            total: self.total,
            last_error: self.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fake_users;

    fn page(count: usize, has_more: bool) -> DiscoverResult {
        DiscoverResult {
            users: fake_users("u", count),
            total: count,
            has_more,
        }
    }

    #[test]
    fn test_begin_search_uses_filter_radius() {
        let mut session = SearchSession::new(50);
        session.begin_search(SearchFilters::new().with_max_distance_km(120), 50);
        assert_eq!(session.current_radius_km, 120);
        assert_eq!(session.phase, SessionPhase::Searching);

        session.begin_search(SearchFilters::new(), 50);
        assert_eq!(session.current_radius_km, 50);
        assert_eq!(session.generation, 2);
    }

    #[test]
    fn test_expansion_radii_and_bound() {
        let config = DiscoveryConfig::default();
        let mut session = SearchSession::new(50);
        session.begin_search(SearchFilters::new(), 50);

        let mut radii = Vec::new();
        while let Some(radius) = session.next_expansion_radius(&config) {
            radii.push(radius);
            session.begin_expansion(radius);
        }

        assert_eq!(radii, vec![50, 150, 250]);
        assert_eq!(session.expansion_attempt, 3);
        assert_eq!(session.current_radius_km, 250);
    }

    #[test]
    fn test_expansion_respects_cap_and_toggle() {
        let config = DiscoveryConfig::default().with_max_distance_km(120);
        let mut session = SearchSession::new(50);
        session.begin_search(SearchFilters::new(), 50);

        assert_eq!(session.next_expansion_radius(&config), Some(50));
        session.begin_expansion(50);
        assert_eq!(session.next_expansion_radius(&config), None);

        let disabled = DiscoveryConfig::default().with_auto_expand(false);
        session.begin_search(SearchFilters::new(), 50);
        assert_eq!(session.next_expansion_radius(&disabled), None);
    }

    #[test]
    fn test_expansion_steps_from_initial_distance() {
        let config = DiscoveryConfig::default();
        let mut session = SearchSession::new(50);
        session.begin_search(SearchFilters::new().with_max_distance_km(30), 50);
        assert_eq!(session.current_radius_km, 30);

        let mut queried = Vec::new();
        while let Some(radius) = session.next_expansion_radius(&config) {
            session.begin_expansion(radius);
            queried.push(session.current_radius_km);
        }
        assert_eq!(queried, vec![50, 150, 250]);

        // A wide filter radius is never narrowed by expansion
        session.begin_search(SearchFilters::new().with_max_distance_km(300), 50);
        session.begin_expansion(session.next_expansion_radius(&config).unwrap());
        assert_eq!(session.current_radius_km, 300);
    }

    #[test]
    fn test_pages_keep_offset_in_step() {
        let mut session = SearchSession::new(50);
        session.begin_search(SearchFilters::new(), 50);
        session.apply_first_page(page(20, true));
        session.settle();
        assert_eq!(session.page_offset, 20);

        let (_, query) = session.begin_load_more(20).unwrap();
        assert_eq!(query.offset, 20);
        assert_eq!(query.filters.max_distance_km, Some(50));
        assert!(session.begin_load_more(20).is_none(), "already loading");

        session.apply_next_page(page(5, false));
        assert_eq!(session.accumulated_results.len(), 25);
        assert_eq!(session.page_offset, 25);
        assert!(session.begin_load_more(20).is_none(), "no more pages");
    }

    #[test]
    fn test_reset_keeps_home_location() {
        let mut session = SearchSession::new(50);
        let home = HomeLocation::new("Amsterdam", crate::GeoCoordinates::new(52.37, 4.90));
        assert!(session.set_home_location(home.clone()));
        assert!(!session.set_home_location(HomeLocation::new(
            "Paris",
            crate::GeoCoordinates::new(48.86, 2.35)
        )));

        session.begin_search(SearchFilters::new().with_max_distance_km(300), 50);
        session.apply_first_page(page(3, false));
        session.reset(50);

        assert_eq!(session.phase, SessionPhase::Idle);
        assert_eq!(session.generation, 2);
        assert_eq!(session.current_radius_km, 50);
        assert!(session.accumulated_results.is_empty());
        assert_eq!(session.home_location, Some(home));
    }
}
