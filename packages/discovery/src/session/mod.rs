//! Discovery sessions.
//!
//! A [`DiscoveryOrchestrator`] owns one session: the home location, the
//! current filters and radius, and the accumulated result pages. See
//! [`SessionPhase`] for the lifecycle.

mod orchestrator;
mod state;

pub use orchestrator::DiscoveryOrchestrator;
pub use state::{SessionPhase, SessionSnapshot};

/// The searching user's profile location, as known at mount time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileLocation {
    pub place_name: Option<String>,
    pub sharing_enabled: bool,
}

impl ProfileLocation {
    /// A location the user agreed to share.
    pub fn shared(place_name: impl Into<String>) -> Self {
        Self {
            place_name: Some(place_name.into()),
            sharing_enabled: true,
        }
    }

    /// A location the user keeps private.
    pub fn private(place_name: impl Into<String>) -> Self {
        Self {
            place_name: Some(place_name.into()),
            sharing_enabled: false,
        }
    }

    /// Trimmed place name, if sharing is on and the name is non-empty.
    pub fn shareable_place(&self) -> Option<&str> {
        if !self.sharing_enabled {
            return None;
        }
        self.place_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// How a session operation ended
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// The operation ran to completion; the session settled in this state
    Completed(SessionSnapshot),
    /// A newer `search`/`reset` invalidated the operation; its result was dropped
    Superseded,
    /// Nothing to do (fetch already in flight, no more pages, nothing to search from)
    Skipped,
}

impl SearchOutcome {
    pub fn snapshot(&self) -> Option<&SessionSnapshot> {
        match self {
            SearchOutcome::Completed(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}
