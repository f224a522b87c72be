//! Geo-expanding user discovery for JustGift
//!
//! Lets a user browse other senders/receivers filtered by distance, age and
//! favourite event type. Two pieces do the work:
//!
//! - [`geocoding`] - resolves free-text place names to coordinates, memoizing
//!   hits and misses for a TTL so the rate-limited provider is hit rarely.
//! - [`session`] - the discovery session: issues paginated, distance-bounded
//!   queries against a [`UserDirectory`], widens the radius automatically when
//!   a first page comes back empty, and accumulates pages for "load more".
//!
//! # Usage
//!
//! ```rust,ignore
//! use discovery::{DiscoveryConfig, DiscoveryOrchestrator, GeocodeCache, MemoryDirectory};
//! use discovery::geocoding::NominatimGeocoder;
//!
//! let cache = Arc::new(GeocodeCache::new(Arc::new(NominatimGeocoder::default())));
//! let orchestrator = DiscoveryOrchestrator::new(directory, cache, DiscoveryConfig::default());
//!
//! orchestrator.initialize(&ProfileLocation::shared("Amsterdam")).await?;
//! orchestrator.load_more().await?;
//! let snapshot = orchestrator.snapshot();
//! ```
//!
//! # Modules
//!
//! - [`types`] - Wire and domain types (coordinates, filters, results)
//! - [`directory`] - User directory trait and implementations
//! - [`geocoding`] - Geocoding providers and the TTL cache
//! - [`session`] - Discovery session state machine
//! - [`testing`] - Mock implementations for testing

pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod geocoding;
pub mod session;
pub mod testing;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use config::{DiscoveryConfig, GeocodingConfig};
pub use directory::{HttpDirectory, MemoryDirectory, UserDirectory, UserProfile};
pub use error::{ConfigError, DirectoryError, DiscoveryError, GeocodeError, Result};
pub use geocoding::{GeocodeCache, GeocodeCacheEntry, Geocoder, GeocodeMatch};
pub use session::{
    DiscoveryOrchestrator, ProfileLocation, SearchOutcome, SessionPhase, SessionSnapshot,
};
pub use types::{
    filters::SearchFilters,
    geo::{GeoCoordinates, HomeLocation},
    query::{DiscoverQuery, DiscoverResult},
    user::{DiscoveredUser, UserRole, UserSummary},
};

#[cfg(feature = "postgres")]
pub use directory::PgDirectory;
