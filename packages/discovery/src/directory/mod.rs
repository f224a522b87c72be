//! User directory: the paginated, distance-aware query over user records.
//!
//! Implementations:
//! - [`MemoryDirectory`] - in-process, for tests, demos and development
//! - [`HttpDirectory`] - the app's `discoverUsers` callable endpoint
//! - `PgDirectory` - Postgres, behind the `postgres` feature

mod http;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;

use async_trait::async_trait;

use crate::error::DirectoryResult;
use crate::types::query::{DiscoverQuery, DiscoverResult};

pub use http::HttpDirectory;
pub use memory::{MemoryDirectory, UserProfile};
#[cfg(feature = "postgres")]
pub use postgres::PgDirectory;

/// Paginated, filterable, distance-aware query over user records.
///
/// Implementations must:
/// - only return users within `filters.max_distance_km` of
///   `home_location.coordinates` when a home location is given, sorted by
///   ascending distance
/// - honor the inclusive age range and event-type filter
/// - paginate stably by `offset`/`limit`
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn discover(&self, query: &DiscoverQuery) -> DirectoryResult<DiscoverResult>;
}
