//! Configuration for discovery sessions and geocoding.
//!
//! Both configs have sensible defaults and can be overridden from the
//! environment (a `.env` file is loaded first, if present).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use dotenvy::dotenv;

use crate::error::ConfigError;

/// Tuning for a discovery session.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Radius of the first query when filters carry no distance.
    ///
    /// Default: 50km.
    pub initial_distance_km: u32,

    /// Automatic expansion never queries beyond this radius.
    ///
    /// Default: 500km.
    pub max_distance_km: u32,

    /// Radius added per expansion attempt.
    ///
    /// Default: 100km.
    pub expansion_step_km: u32,

    /// Maximum automatic re-queries after an empty first page.
    ///
    /// Default: 3.
    pub max_expansion_attempts: u32,

    /// Users requested per page. Default: 20.
    pub page_size: usize,

    /// Pause before each expansion re-query. Default: 500ms.
    pub expansion_delay: Duration,

    /// Widen the radius automatically, and search on initial mount.
    ///
    /// Default: true.
    pub auto_expand: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            initial_distance_km: 50,
            max_distance_km: 500,
            expansion_step_km: 100,
            max_expansion_attempts: 3,
            page_size: 20,
            expansion_delay: Duration::from_millis(500),
            auto_expand: true,
        }
    }
}

impl DiscoveryConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `DISCOVERY_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv();
        let defaults = Self::default();

        let config = Self {
            initial_distance_km: env_or(
                "DISCOVERY_INITIAL_DISTANCE_KM",
                "integer",
                defaults.initial_distance_km,
            )?,
            max_distance_km: env_or(
                "DISCOVERY_MAX_DISTANCE_KM",
                "integer",
                defaults.max_distance_km,
            )?,
            expansion_step_km: env_or(
                "DISCOVERY_EXPANSION_STEP_KM",
                "integer",
                defaults.expansion_step_km,
            )?,
            max_expansion_attempts: env_or(
                "DISCOVERY_MAX_EXPANSION_ATTEMPTS",
                "integer",
                defaults.max_expansion_attempts,
            )?,
            page_size: env_or("DISCOVERY_PAGE_SIZE", "integer", defaults.page_size)?,
            expansion_delay: Duration::from_millis(env_or(
                "DISCOVERY_EXPANSION_DELAY_MS",
                "integer",
                defaults.expansion_delay.as_millis() as u64,
            )?),
            auto_expand: env_or("DISCOVERY_AUTO_EXPAND", "boolean", defaults.auto_expand)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the session cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Inconsistent {
                reason: "page size must be greater than zero".to_string(),
            });
        }
        if self.initial_distance_km > self.max_distance_km {
            return Err(ConfigError::Inconsistent {
                reason: format!(
                    "initial distance {}km exceeds max distance {}km",
                    self.initial_distance_km, self.max_distance_km
                ),
            });
        }
        Ok(())
    }

    pub fn with_initial_distance_km(mut self, km: u32) -> Self {
        self.initial_distance_km = km;
        self
    }

    pub fn with_max_distance_km(mut self, km: u32) -> Self {
        self.max_distance_km = km;
        self
    }

    pub fn with_expansion_step_km(mut self, km: u32) -> Self {
        self.expansion_step_km = km;
        self
    }

    pub fn with_max_expansion_attempts(mut self, attempts: u32) -> Self {
        self.max_expansion_attempts = attempts;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_expansion_delay(mut self, delay: Duration) -> Self {
        self.expansion_delay = delay;
        self
    }

    pub fn with_auto_expand(mut self, enabled: bool) -> Self {
        self.auto_expand = enabled;
        self
    }
}

/// Geocoding provider and cache settings.
#[derive(Debug, Clone)]
pub struct GeocodingConfig {
    /// Provider base URL. Default: public Nominatim instance.
    pub base_url: String,

    /// Sent as `User-Agent`; Nominatim rejects anonymous clients.
    pub user_agent: String,

    /// Per-request timeout. Default: 10s.
    pub timeout: Duration,

    /// How long cached lookups (hits and misses) stay fresh. Default: 24h.
    pub cache_ttl: TimeDelta,

    /// Provider requests allowed per second. Default: 1.
    pub requests_per_second: u32,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "JustGift/1.0 (user discovery)".to_string(),
            timeout: Duration::from_secs(10),
            cache_ttl: TimeDelta::hours(24),
            requests_per_second: 1,
        }
    }
}

impl GeocodingConfig {
    /// Load from `GEOCODER_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv();
        let defaults = Self::default();

        let requests_per_second =
            env_or("GEOCODER_REQUESTS_PER_SECOND", "integer", defaults.requests_per_second)?;
        if requests_per_second == 0 {
            return Err(ConfigError::Inconsistent {
                reason: "GEOCODER_REQUESTS_PER_SECOND must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            base_url: env::var("GEOCODER_BASE_URL").unwrap_or(defaults.base_url),
            user_agent: env::var("GEOCODER_USER_AGENT").unwrap_or(defaults.user_agent),
            timeout: Duration::from_secs(env_or(
                "GEOCODER_TIMEOUT_SECS",
                "integer",
                defaults.timeout.as_secs(),
            )?),
            cache_ttl: TimeDelta::hours(env_or(
                "GEOCODER_CACHE_TTL_HOURS",
                "integer",
                defaults.cache_ttl.num_hours(),
            )?),
            requests_per_second,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: TimeDelta) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = rps;
        self
    }
}

fn env_or<T: FromStr>(
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
        Err(_) => Ok(default),
    }
}
