use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::RwLock;
use tracing::debug;

use super::UserDirectory;
use crate::error::DirectoryResult;
use crate::types::{
    geo::GeoCoordinates,
    query::{DiscoverQuery, DiscoverResult},
    user::{DiscoveredUser, UserSummary},
};

/// A user record as stored by the directory
///
/// Coordinates are kept coarsened; they never leave the directory, only the
/// derived distance does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user: UserSummary,
    #[serde(default)]
    pub coordinates: Option<GeoCoordinates>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub favorite_event_type_ids: Vec<String>,
    /// Users who turned off location sharing are never discoverable
    #[serde(default = "default_discoverable")]
    pub discoverable: bool,
}

fn default_discoverable() -> bool {
    true
}

impl UserProfile {
    pub fn new(user: UserSummary) -> Self {
        Self {
            user,
            coordinates: None,
            age: None,
            favorite_event_type_ids: Vec::new(),
            discoverable: true,
        }
    }

    pub fn with_coordinates(mut self, coordinates: GeoCoordinates) -> Self {
        self.coordinates = Some(coordinates.coarsened());
        self
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_favorite_event_types(
        mut self,
        ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.favorite_event_type_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.discoverable = false;
        self
    }
}

/// In-memory user directory.
///
/// Useful for testing and development. Filtering and sorting happen on every
/// query, which is fine for the few thousand records it is meant for.
#[derive(Default)]
pub struct MemoryDirectory {
    profiles: RwLock<Vec<UserProfile>>,
    exclude_uid: Option<String>,
}

impl MemoryDirectory {
    /// Create a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory holding `profiles`.
    pub fn with_profiles(profiles: Vec<UserProfile>) -> Self {
        Self {
            profiles: RwLock::new(profiles),
            exclude_uid: None,
        }
    }

    /// Never return this user (the one doing the searching).
    pub fn excluding(mut self, uid: impl Into<String>) -> Self {
        self.exclude_uid = Some(uid.into());
        self
    }

    /// Add or replace a profile (keyed by uid).
    pub fn upsert(&self, profile: UserProfile) {
        let mut profiles = self.profiles.write().unwrap();
        match profiles.iter_mut().find(|p| p.user.uid == profile.user.uid) {
            Some(existing) => *existing = profile,
            None => profiles.push(profile),
        }
    }

    /// Number of stored profiles.
    pub fn len(&self) -> usize {
        self.profiles.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn candidates(&self, query: &DiscoverQuery) -> Vec<DiscoveredUser> {
        let profiles = self.profiles.read().unwrap();
        let origin = query.home_location.as_ref().map(|home| home.coordinates);
        let radius_km = query.filters.max_distance_km.map(f64::from);

        let mut matches: Vec<DiscoveredUser> = profiles
            .iter()
            .filter(|p| p.discoverable)
            .filter(|p| self.exclude_uid.as_deref() != Some(p.user.uid.as_str()))
            .filter(|p| query.filters.matches_age(p.age))
            .filter(|p| match &query.filters.event_type_id {
                Some(event_type) => p.favorite_event_type_ids.contains(event_type),
                None => true,
            })
            .filter_map(|p| {
                let distance_km = match origin {
                    Some(origin) => {
                        // Without coordinates a user can't be placed within any radius
                        let distance = origin.distance_km(&p.coordinates?);
                        if radius_km.is_some_and(|radius| distance > radius) {
                            return None;
                        }
                        Some(distance)
                    }
                    None => None,
                };

                Some(DiscoveredUser {
                    user: p.user.clone(),
                    distance_km,
                    favorite_event_type_ids: (!p.favorite_event_type_ids.is_empty())
                        .then(|| p.favorite_event_type_ids.clone()),
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            let by_distance = match (a.distance_km, b.distance_km) {
                (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            };
            by_distance.then_with(|| a.user.uid.cmp(&b.user.uid))
        });

        matches
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn discover(&self, query: &DiscoverQuery) -> DirectoryResult<DiscoverResult> {
        let matches = self.candidates(query);
        let total = matches.len();

        let users: Vec<DiscoveredUser> = matches
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();
        let has_more = query.offset + users.len() < total;

        debug!(
            total,
            returned = users.len(),
            offset = query.offset,
            radius_km = ?query.radius_km(),
            "Memory directory query"
        );

        Ok(DiscoverResult {
            users,
            total,
            has_more,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{filters::SearchFilters, geo::HomeLocation, user::UserRole};

    fn profile(uid: &str, lat: f64, lng: f64) -> UserProfile {
        UserProfile::new(UserSummary::new(uid, UserRole::Receiver))
            .with_coordinates(GeoCoordinates::new(lat, lng))
    }

    fn amsterdam() -> HomeLocation {
        HomeLocation::new("Amsterdam", GeoCoordinates::new(52.37, 4.90))
    }

    fn query(filters: SearchFilters, offset: usize, limit: usize) -> DiscoverQuery {
        DiscoverQuery {
            home_location: Some(amsterdam()),
            filters,
            limit,
            offset,
        }
    }

    #[tokio::test]
    async fn test_distance_filter_and_sort() {
        let directory = MemoryDirectory::with_profiles(vec![
            profile("rotterdam", 51.92, 4.48),
            profile("utrecht", 52.09, 5.12),
            profile("paris", 48.86, 2.35),
            UserProfile::new(UserSummary::new("nowhere", UserRole::Sender)),
        ]);

        let result = directory
            .discover(&query(SearchFilters::new().with_max_distance_km(100), 0, 20))
            .await
            .unwrap();

        let uids: Vec<_> = result.users.iter().map(|u| u.uid()).collect();
        assert_eq!(uids, vec!["utrecht", "rotterdam"]);
        assert_eq!(result.total, 2);
        assert!(!result.has_more);
        assert!(result.users[0].distance_km.unwrap() < result.users[1].distance_km.unwrap());
    }

    #[tokio::test]
    async fn test_without_home_location_returns_everyone() {
        let directory = MemoryDirectory::with_profiles(vec![
            profile("rotterdam", 51.92, 4.48),
            UserProfile::new(UserSummary::new("nowhere", UserRole::Sender)),
        ]);

        let result = directory
            .discover(&DiscoverQuery {
                home_location: None,
                filters: SearchFilters::new().with_max_distance_km(10),
                limit: 20,
                offset: 0,
            })
            .await
            .unwrap();

        assert_eq!(result.total, 2);
        assert!(result.users.iter().all(|u| u.distance_km.is_none()));
    }

    #[tokio::test]
    async fn test_age_event_and_visibility_filters() {
        let directory = MemoryDirectory::with_profiles(vec![
            profile("young", 52.37, 4.90)
                .with_age(17)
                .with_favorite_event_types(["birthday"]),
            profile("match", 52.37, 4.91)
                .with_age(25)
                .with_favorite_event_types(["birthday", "wedding"]),
            profile("wrong-event", 52.37, 4.92)
                .with_age(25)
                .with_favorite_event_types(["condolence"]),
            profile("hidden", 52.37, 4.93)
                .with_age(25)
                .with_favorite_event_types(["birthday"])
                .hidden(),
            profile("me", 52.37, 4.90)
                .with_age(25)
                .with_favorite_event_types(["birthday"]),
        ])
        .excluding("me");

        let filters = SearchFilters::new()
            .with_max_distance_km(50)
            .with_age_range(Some(18), Some(40))
            .with_event_type("birthday");
        let result = directory.discover(&query(filters, 0, 20)).await.unwrap();

        let uids: Vec<_> = result.users.iter().map(|u| u.uid()).collect();
        assert_eq!(uids, vec!["match"]);
        assert_eq!(
            result.users[0].favorite_event_type_ids,
            Some(vec!["birthday".to_string(), "wedding".to_string()])
        );
    }

    #[tokio::test]
    async fn test_pagination() {
        let profiles = (0..45)
            .map(|i| profile(&format!("user-{i:02}"), 52.37, 4.90))
            .collect();
        let directory = MemoryDirectory::with_profiles(profiles);
        let filters = SearchFilters::new().with_max_distance_km(50);

        let first = directory.discover(&query(filters.clone(), 0, 20)).await.unwrap();
        assert_eq!(first.users.len(), 20);
        assert!(first.has_more);
        assert_eq!(first.total, 45);

        let last = directory.discover(&query(filters.clone(), 40, 20)).await.unwrap();
        assert_eq!(last.users.len(), 5);
        assert!(!last.has_more);
        assert_eq!(last.users[0].uid(), "user-40");

        let past_end = directory.discover(&query(filters, 60, 20)).await.unwrap();
        assert!(past_end.users.is_empty());
        assert!(!past_end.has_more);
    }

    #[test]
    fn test_upsert_replaces_by_uid() {
        let directory = MemoryDirectory::new();
        directory.upsert(profile("a", 52.0, 4.0));
        directory.upsert(profile("a", 53.0, 5.0).with_age(30));
        directory.upsert(profile("b", 52.0, 4.0));

        assert_eq!(directory.len(), 2);
    }
}
