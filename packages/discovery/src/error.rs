//! Typed errors for the discovery library.
//!
//! Uses `thiserror` for library errors (not `anyhow`); only the `discover`
//! binary flattens them into `anyhow::Error`.

use thiserror::Error;

/// Errors surfaced by discovery session operations.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The user directory query failed
    #[error("directory query failed: {0}")]
    Directory(#[from] DirectoryError),
}

impl DiscoveryError {
    /// Message suitable for showing to the searching user.
    pub fn user_message(&self) -> String {
        match self {
            DiscoveryError::Directory(DirectoryError::Rejected { message, .. }) => message.clone(),
            DiscoveryError::Directory(_) => "Failed to search users".to_string(),
        }
    }
}

/// Errors from a user directory backend.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Transport failure talking to the directory
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Directory answered but refused the query
    #[error("directory rejected query ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Response body could not be decoded
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Storage backend failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from a geocoding provider.
///
/// Never crosses the [`GeocodeCache`](crate::GeocodeCache) boundary: the
/// cache records a negative entry instead.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Request to the provider failed
    #[error("geocoding request failed: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Provider returned a non-success status
    #[error("geocoding provider returned {status}")]
    Status { status: u16 },

    /// Latitude or longitude could not be parsed
    #[error("invalid coordinate in response: {value}")]
    InvalidCoordinate { value: String },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Variable is present but not parseable
    #[error("{name} must be a valid {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    /// Values are individually valid but inconsistent
    #[error("inconsistent config: {reason}")]
    Inconsistent { reason: String },
}

/// Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Result type alias for directory operations.
pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

/// Result type alias for geocoding provider operations.
pub type GeocodeResult<T> = std::result::Result<T, GeocodeError>;
