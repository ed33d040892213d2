//! Home-screen orchestration.
//!
//! The screen shows one of two independent result lists: doctors near the
//! user (server-ranked) or doctors matching a typed name (ranked locally).
//! Manual search input is debounced; each list has its own sequence counter
//! so a slow request can never overwrite the results of a newer one, and
//! closing the screen makes every outstanding continuation a no-op.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::{DirectorySource, NearbySource};
use crate::cache::DirectoryCache;
use crate::directory::EnrichedDoctor;
use crate::error::Result;
use crate::favorites::{displayable, FavoriteEntry, FavoritesStore};
use crate::geo::Coordinate;
use crate::location::{acquire_location, LocationProvider};
use crate::nearby::NearbyFetcher;
use crate::search::SearchEngine;
use crate::storage::KeyValueStore;

/// Which list the screen is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchMode {
    /// Server-side proximity search around the device.
    #[default]
    Nearby,
    /// Name search over the cached directory.
    Manual,
}

/// What happened to a request once it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenUpdate {
    /// Results were stored; `count` doctors are now listed.
    Applied {
        /// Number of doctors in the updated list.
        count: usize,
    },
    /// A newer request was issued first; these results were discarded.
    Superseded,
    /// The screen was closed; nothing was stored.
    Closed,
    /// Nothing needed fetching.
    Idle,
}

#[derive(Debug, Default)]
struct ScreenState {
    mode: SearchMode,
    query: String,
    last_location: Option<Coordinate>,
    nearby: Vec<EnrichedDoctor>,
    manual: Vec<EnrichedDoctor>,
}

/// Collaborators the controller is built from.
pub struct ScreenParts<D, N, L, S> {
    /// Directory cache for this session.
    pub cache: Arc<DirectoryCache<D>>,
    /// Proximity search.
    pub nearby: NearbyFetcher<N>,
    /// Device location.
    pub location: L,
    /// Manual search policy.
    pub engine: SearchEngine,
    /// Favorites, shared with the rest of the app.
    pub favorites: Arc<FavoritesStore<S>>,
    /// Scope for favorites; `None` when signed out.
    pub user_id: Option<String>,
}

/// Drives the home screen's two result lists.
pub struct ScreenController<D, N, L, S> {
    parts: ScreenParts<D, N, L, S>,
    state: Mutex<ScreenState>,
    nearby_seq: AtomicU64,
    manual_seq: AtomicU64,
    closed: AtomicBool,
}

impl<D, N, L, S> ScreenController<D, N, L, S>
where
    D: DirectorySource,
    N: NearbySource,
    L: LocationProvider,
    S: KeyValueStore,
{
    /// Create a controller in [`SearchMode::Nearby`] with empty lists.
    pub fn new(parts: ScreenParts<D, N, L, S>) -> Self {
        Self {
            parts,
            state: Mutex::new(ScreenState::default()),
            nearby_seq: AtomicU64::new(0),
            manual_seq: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ScreenState) -> T) -> T {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn is_current(&self, seq: &AtomicU64, ticket: u64) -> bool {
        !self.closed.load(Ordering::Acquire) && seq.load(Ordering::Acquire) == ticket
    }

    fn next_ticket(seq: &AtomicU64) -> u64 {
        seq.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// The active mode.
    pub fn mode(&self) -> SearchMode {
        self.with_state(|s| s.mode)
    }

    /// The list for the active mode.
    pub fn results(&self) -> Vec<EnrichedDoctor> {
        self.with_state(|s| match s.mode {
            SearchMode::Nearby => s.nearby.clone(),
            SearchMode::Manual => s.manual.clone(),
        })
    }

    /// The proximity list, regardless of mode.
    pub fn nearby_results(&self) -> Vec<EnrichedDoctor> {
        self.with_state(|s| s.nearby.clone())
    }

    /// The name-search list, regardless of mode.
    pub fn manual_results(&self) -> Vec<EnrichedDoctor> {
        self.with_state(|s| s.manual.clone())
    }

    /// The last coordinate obtained from the device, if any.
    pub fn last_location(&self) -> Option<Coordinate> {
        self.with_state(|s| s.last_location)
    }

    /// Switch lists. Switching to [`SearchMode::Nearby`] fetches immediately.
    ///
    /// Any request still running for the list being left is discarded when it
    /// completes.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::refresh_nearby`].
    pub async fn set_mode(&self, mode: SearchMode) -> Result<ScreenUpdate> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(ScreenUpdate::Closed);
        }
        self.with_state(|s| s.mode = mode);
        debug!(?mode, "Search mode changed");
        match mode {
            SearchMode::Nearby => {
                Self::next_ticket(&self.manual_seq);
                self.refresh_nearby().await
            }
            SearchMode::Manual => {
                Self::next_ticket(&self.nearby_seq);
                Ok(ScreenUpdate::Idle)
            }
        }
    }

    /// Acquire the device location and fetch doctors around it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::MedibookError::PermissionDenied`] when location access
    /// is refused, or the fetch error. A failed fetch that is still current
    /// clears the proximity list.
    pub async fn refresh_nearby(&self) -> Result<ScreenUpdate> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(ScreenUpdate::Closed);
        }
        let ticket = Self::next_ticket(&self.nearby_seq);

        let origin = match acquire_location(&self.parts.location).await {
            Ok(origin) => origin,
            Err(e) if self.is_current(&self.nearby_seq, ticket) => return Err(e),
            Err(_) => return Ok(self.stale_outcome()),
        };
        self.with_state(|s| s.last_location = Some(origin));

        let fetched = self.parts.nearby.fetch(origin).await;
        if !self.is_current(&self.nearby_seq, ticket) {
            debug!(ticket, "Discarding superseded nearby results");
            return Ok(self.stale_outcome());
        }

        match fetched {
            Ok(doctors) => {
                let count = doctors.len();
                self.with_state(|s| s.nearby = doctors);
                Ok(ScreenUpdate::Applied { count })
            }
            Err(e) => {
                warn!(error = %e, "Nearby fetch failed");
                self.with_state(|s| s.nearby.clear());
                Err(e)
            }
        }
    }

    /// Handle a change to the search box.
    ///
    /// Waits for the quiescence window; if another keystroke arrives first
    /// this call returns [`ScreenUpdate::Superseded`] without searching.
    ///
    /// # Errors
    ///
    /// Returns the directory fetch error if the cache cannot be loaded.
    pub async fn search(&self, query: &str) -> Result<ScreenUpdate> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(ScreenUpdate::Closed);
        }
        let ticket = Self::next_ticket(&self.manual_seq);
        self.with_state(|s| s.query = query.to_string());

        tokio::time::sleep(self.parts.engine.policy().debounce()).await;
        if !self.is_current(&self.manual_seq, ticket) {
            return Ok(self.stale_outcome());
        }

        self.run_search(ticket, query).await
    }

    /// Re-run the active list from fresh data.
    ///
    /// In manual mode the directory cache is invalidated and the current
    /// query is searched again without waiting for the debounce window.
    ///
    /// # Errors
    ///
    /// Propagates fetch errors.
    pub async fn refresh(&self) -> Result<ScreenUpdate> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(ScreenUpdate::Closed);
        }
        match self.mode() {
            SearchMode::Nearby => self.refresh_nearby().await,
            SearchMode::Manual => {
                self.parts.cache.invalidate();
                let ticket = Self::next_ticket(&self.manual_seq);
                let query = self.with_state(|s| s.query.clone());
                self.run_search(ticket, &query).await
            }
        }
    }

    async fn run_search(&self, ticket: u64, query: &str) -> Result<ScreenUpdate> {
        if !self.parts.engine.accepts(query) {
            self.with_state(|s| s.manual.clear());
            return Ok(ScreenUpdate::Applied { count: 0 });
        }

        let snapshot = match self.parts.cache.ensure_loaded().await {
            Ok(snapshot) => snapshot,
            Err(e) if self.is_current(&self.manual_seq, ticket) => return Err(e),
            Err(_) => return Ok(self.stale_outcome()),
        };
        if !self.is_current(&self.manual_seq, ticket) {
            debug!(ticket, "Discarding superseded search");
            return Ok(self.stale_outcome());
        }

        let location = self.last_location();
        let results = self.parts.engine.search(query, &snapshot, location);
        let count = results.len();
        self.with_state(|s| s.manual = results);
        Ok(ScreenUpdate::Applied { count })
    }

    fn stale_outcome(&self) -> ScreenUpdate {
        if self.closed.load(Ordering::Acquire) {
            ScreenUpdate::Closed
        } else {
            ScreenUpdate::Superseded
        }
    }

    /// Favorites for quick access, hiding entries without usable identifiers.
    ///
    /// Signed-out users have none.
    pub async fn quick_access(&self) -> Vec<FavoriteEntry> {
        match &self.parts.user_id {
            Some(user) => displayable(self.parts.favorites.list(user).await),
            None => Vec::new(),
        }
    }

    /// Whether a listed pairing is one of the user's favorites.
    pub async fn is_favorite(&self, doctor_id: &str, dispensary_id: &str) -> bool {
        match &self.parts.user_id {
            Some(user) => {
                self.parts
                    .favorites
                    .is_favorite(user, doctor_id, dispensary_id)
                    .await
            }
            None => false,
        }
    }

    /// Leave the screen. Outstanding requests finish as [`ScreenUpdate::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        Self::next_ticket(&self.nearby_seq);
        Self::next_ticket(&self.manual_seq);
        debug!("Screen closed");
    }
}
