use serde::{Deserialize, Serialize};

use super::filters::SearchFilters;
use super::geo::HomeLocation;
use super::user::DiscoveredUser;

/// One page request to a user directory
///
/// `filters.max_distance_km` is always populated with the session's current
/// radius by the time a query is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_location: Option<HomeLocation>,
    pub filters: SearchFilters,
    pub limit: usize,
    pub offset: usize,
}

impl DiscoverQuery {
    /// Radius this query is bounded by.
    pub fn radius_km(&self) -> Option<u32> {
        self.filters.max_distance_km
    }
}

/// One page of directory results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverResult {
    pub users: Vec<DiscoveredUser>,
    pub total: usize,
    pub has_more: bool,
}

impl DiscoverResult {
    pub fn empty() -> Self {
        Self::default()
    }
}
