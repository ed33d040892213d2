//! Manual doctor search over a directory snapshot.
//!
//! Matching is a case-insensitive substring test against the doctor's display
//! name; there is no tokenization or fuzzy matching. Each match is enriched
//! with the dispensaries it references and, when the user's location is known,
//! the distance to each one.
//!
//! # Ordering
//!
//! - Within a doctor: ascending distance, unknown distances last.
//! - Across doctors (location known): ascending nearest distance, doctors
//!   without any distance last, ties in directory order.
//! - Across doctors (no location): directory order.

use std::cmp::Ordering;

use tracing::debug;

use crate::cache::DirectorySnapshot;
use crate::config::SearchConfig;
use crate::directory::{AvailabilityEntry, Doctor, EnrichedDoctor};
use crate::geo::Coordinate;

/// Ascending order for optional distances with `None` treated as +∞.
fn cmp_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stateless search over a [`DirectorySnapshot`].
#[derive(Debug, Clone, Default)]
pub struct SearchEngine {
    policy: SearchConfig,
}

impl SearchEngine {
    /// Create an engine with the given query policy.
    #[must_use]
    pub const fn new(policy: SearchConfig) -> Self {
        Self { policy }
    }

    /// The active query policy.
    #[must_use]
    pub const fn policy(&self) -> &SearchConfig {
        &self.policy
    }

    /// Whether `query` is long enough to be searched.
    ///
    /// Shorter queries produce an empty result set without calling [`Self::search`].
    #[must_use]
    pub fn accepts(&self, query: &str) -> bool {
        query.trim().chars().count() >= self.policy.min_query_len
    }

    /// Rank the doctors of `snapshot` whose names contain `query`.
    ///
    /// Matching is case-insensitive and takes the query as typed, surrounding
    /// whitespace included; trimming only applies to [`Self::accepts`].
    /// Reads the snapshot only. An unmatched query yields an empty list.
    #[must_use]
    pub fn search(
        &self,
        query: &str,
        snapshot: &DirectorySnapshot,
        location: Option<Coordinate>,
    ) -> Vec<EnrichedDoctor> {
        let folded = query.to_lowercase();
        let location = location.filter(Coordinate::is_valid);

        let mut results: Vec<EnrichedDoctor> = snapshot
            .doctors()
            .iter()
            .filter(|doctor| doctor.name.to_lowercase().contains(&folded))
            .map(|doctor| enrich(doctor, snapshot, location))
            .collect();

        if location.is_some() {
            // `sort_by` is stable, so ties keep directory order.
            results.sort_by(|a, b| cmp_distance(a.nearest_distance(), b.nearest_distance()));
        }

        debug!(
            query = %folded,
            matches = results.len(),
            with_location = location.is_some(),
            "Search completed"
        );
        results
    }
}

/// Resolve a doctor's dispensaries and attach distances.
fn enrich(
    doctor: &Doctor,
    snapshot: &DirectorySnapshot,
    location: Option<Coordinate>,
) -> EnrichedDoctor {
    let mut available_at: Vec<AvailabilityEntry> = doctor
        .dispensary_ids
        .iter()
        .filter_map(|id| snapshot.dispensary(id))
        .map(|dispensary| {
            let distance_km = match (location, dispensary.coordinate) {
                (Some(from), Some(to)) => Some(from.distance_to(&to)),
                _ => None,
            };
            AvailabilityEntry {
                dispensary: dispensary.clone(),
                distance_km,
                fees: dispensary.fees,
            }
        })
        .collect();

    available_at.sort_by(|a, b| cmp_distance(a.distance_km, b.distance_km));

    EnrichedDoctor {
        doctor: doctor.clone(),
        available_at,
    }
}
