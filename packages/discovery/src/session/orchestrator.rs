use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::state::{SearchSession, SessionPhase, SessionSnapshot};
use super::{ProfileLocation, SearchOutcome};
use crate::config::DiscoveryConfig;
use crate::directory::UserDirectory;
use crate::error::{DiscoveryError, Result};
use crate::geocoding::GeocodeCache;
use crate::types::{filters::SearchFilters, geo::HomeLocation};

/// What a first-page response led to
enum Step {
    /// Re-query at a wider radius after the debounce delay
    Expand { radius_km: u32, attempt: u32 },
    Settled(SessionSnapshot),
}

/// Drives one discovery session.
///
/// Share it behind an `Arc`: operations take `&self`, so a `reset()` or a new
/// `search()` can run while an earlier fetch is still awaiting. Every
/// operation captures the session generation when it dispatches a fetch and
/// drops the response if a later `search`/`reset` moved the generation on.
///
/// State lives behind a synchronous mutex that is never held across an
/// `.await`.
pub struct DiscoveryOrchestrator {
    directory: Arc<dyn UserDirectory>,
    geocoder: Arc<GeocodeCache>,
    config: DiscoveryConfig,
    session: Mutex<SearchSession>,
    updates: watch::Sender<SessionSnapshot>,
}

impl DiscoveryOrchestrator {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        geocoder: Arc<GeocodeCache>,
        config: DiscoveryConfig,
    ) -> Self {
        let session = SearchSession::new(config.initial_distance_km);
        let (updates, _) = watch::channel(session.snapshot());

        Self {
            directory,
            geocoder,
            config,
            session: Mutex::new(session),
            updates,
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Current session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().unwrap().snapshot()
    }

    /// Receive a snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    /// Initial mount: resolve the home location, then search if auto-expand is on.
    ///
    /// The home location is resolved at most once per session. A failed
    /// geocode leaves it unset, which disables the automatic search (manual
    /// `search` calls still work, without a distance origin).
    #[instrument(skip(self, profile))]
    pub async fn initialize(&self, profile: &ProfileLocation) -> Result<SearchOutcome> {
        let needs_home = self.session.lock().unwrap().home_location.is_none();

        if needs_home {
            if let Some(place_name) = profile.shareable_place() {
                match self.geocoder.resolve(place_name).await {
                    Some(coordinates) => {
                        self.set_home_location(HomeLocation::new(place_name, coordinates));
                    }
                    None => {
                        warn!(
                            place = %place_name,
                            "Home location could not be geocoded; location search disabled"
                        );
                    }
                }
            }
        }

        let should_search = {
            let session = self.session.lock().unwrap();
            self.config.auto_expand
                && session.phase == SessionPhase::Idle
                && session.home_location.is_some()
        };
        if !should_search {
            debug!("Skipping automatic search on mount");
            return Ok(SearchOutcome::Skipped);
        }

        self.search(SearchFilters::default()).await
    }

    /// Set the distance origin for this session. Ignored once set.
    pub fn set_home_location(&self, home: HomeLocation) -> bool {
        let place = home.place_name.clone();
        let set = self.update(|session| session.set_home_location(home));
        if set {
            info!(place = %place, "Home location set");
        }
        set
    }

    /// Start a new search with `filters`, discarding previous results.
    ///
    /// Resolves once the session settles: results found, expansion exhausted,
    /// or the fetch failed. Returns [`SearchOutcome::Superseded`] if a newer
    /// `search` or `reset` took over in the meantime.
    #[instrument(skip(self), fields(generation = tracing::field::Empty))]
    pub async fn search(&self, filters: SearchFilters) -> Result<SearchOutcome> {
        let initial = self.config.initial_distance_km;
        let generation = self.update(|session| session.begin_search(filters, initial));
        tracing::Span::current().record("generation", generation);

        info!("Starting discovery search");
        self.run_search_sequence(generation).await
    }

    /// Fetch the next page and append it.
    ///
    /// No-op ([`SearchOutcome::Skipped`]) while any fetch is in flight or when
    /// the last page reported no more results. Never widens the radius.
    #[instrument(skip(self))]
    pub async fn load_more(&self) -> Result<SearchOutcome> {
        let page_size = self.config.page_size;
        let Some((generation, query)) = self.update(|session| session.begin_load_more(page_size))
        else {
            debug!("Load more skipped");
            return Ok(SearchOutcome::Skipped);
        };

        debug!(offset = query.offset, "Loading more users");
        let result = self.directory.discover(&query).await;

        let applied = self.update_if_current(generation, |session| match result {
            Ok(page) => {
                session.apply_next_page(page);
                Ok(session.snapshot())
            }
            Err(e) => {
                let e = DiscoveryError::from(e);
                session.fail(e.user_message());
                Err(e)
            }
        });

        match applied {
            None => {
                debug!(generation, "Dropping stale load-more response");
                Ok(SearchOutcome::Superseded)
            }
            Some(Err(e)) => {
                warn!(error = %e, "Load more failed");
                Err(e)
            }
            Some(Ok(snapshot)) => Ok(SearchOutcome::Completed(snapshot)),
        }
    }

    /// Return to `Idle`, invalidating anything in flight.
    pub fn reset(&self) {
        let initial = self.config.initial_distance_km;
        self.update(|session| session.reset(initial));
        debug!("Discovery session reset");
    }

    /// First-page fetch, re-queried at wider radii while pages come back empty.
    async fn run_search_sequence(&self, generation: u64) -> Result<SearchOutcome> {
        let page_size = self.config.page_size;

        loop {
            let Some(query) = self.read_if_current(generation, |session| session.query(0, page_size))
            else {
                return Ok(SearchOutcome::Superseded);
            };

            debug!(radius_km = ?query.radius_km(), "Querying directory");
            let result = self.directory.discover(&query).await;

            let applied = self.update_if_current(generation, |session| match result {
                Ok(page) => {
                    let empty = page.users.is_empty();
                    session.apply_first_page(page);

                    let next = if empty {
                        session.next_expansion_radius(&self.config)
                    } else {
                        None
                    };
                    Ok(match next {
                        Some(radius_km) => {
                            session.begin_expansion(radius_km);
                            Step::Expand {
                                radius_km,
                                attempt: session.expansion_attempt,
                            }
                        }
                        None => {
                            session.settle();
                            Step::Settled(session.snapshot())
                        }
                    })
                }
                Err(e) => {
                    let e = DiscoveryError::from(e);
                    session.fail(e.user_message());
                    Err(e)
                }
            });

            let step = match applied {
                None => {
                    debug!(generation, "Dropping stale search response");
                    return Ok(SearchOutcome::Superseded);
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Discovery search failed");
                    return Err(e);
                }
                Some(Ok(step)) => step,
            };

            match step {
                Step::Settled(snapshot) => {
                    info!(
                        found = snapshot.results.len(),
                        radius_km = snapshot.current_radius_km,
                        attempts = snapshot.expansion_attempt,
                        "Discovery search settled"
                    );
                    return Ok(SearchOutcome::Completed(snapshot));
                }
                Step::Expand { radius_km, attempt } => {
                    info!(radius_km, attempt, "No users found, expanding search radius");
                    tokio::time::sleep(self.config.expansion_delay).await;
                }
            }
        }
    }

    /// Apply `f` and publish the resulting snapshot.
    fn update<R>(&self, f: impl FnOnce(&mut SearchSession) -> R) -> R {
        let mut session = self.session.lock().unwrap();
        let result = f(&mut *session);
        self.updates.send_replace(session.snapshot());
        result
    }

    /// Like [`update`](Self::update), but only while `generation` is current.
    fn update_if_current<R>(
        &self,
        generation: u64,
        f: impl FnOnce(&mut SearchSession) -> R,
    ) -> Option<R> {
        let mut session = self.session.lock().unwrap();
        if session.generation != generation {
            return None;
        }
        let result = f(&mut *session);
        self.updates.send_replace(session.snapshot());
        Some(result)
    }

    fn read_if_current<R>(&self, generation: u64, f: impl FnOnce(&SearchSession) -> R) -> Option<R> {
        let session = self.session.lock().unwrap();
        (session.generation == generation).then(|| f(&*session))
    }
}
