//! In-memory snapshot of the doctor and dispensary directories.
//!
//! A [`DirectoryCache`] is created per search session and passed to whoever
//! needs it; there is no process-wide cache. It loads lazily on the first
//! [`DirectoryCache::ensure_loaded`] and lives until [`DirectoryCache::invalidate`]
//! is called. There is no expiry.
//!
//! Concurrent callers share a single in-flight fetch, whether it succeeds or
//! fails. A load that completes after an `invalidate` still answers its
//! callers but is not committed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::DirectorySource;
use crate::directory::{normalize_dispensaries, normalize_doctors, Dispensary, Doctor};
use crate::error::{MedibookError, Result};

/// An immutable, fully-loaded copy of both directories.
#[derive(Debug, Clone)]
pub struct DirectorySnapshot {
    doctors: Vec<Doctor>,
    doctor_index: HashMap<String, usize>,
    dispensaries: HashMap<String, Dispensary>,
    loaded_at: DateTime<Utc>,
}

impl DirectorySnapshot {
    /// Build a snapshot. Duplicate identifiers keep their first occurrence.
    #[must_use]
    pub fn new(doctors: Vec<Doctor>, dispensaries: Vec<Dispensary>) -> Self {
        let mut doctor_index = HashMap::with_capacity(doctors.len());
        let mut unique = Vec::with_capacity(doctors.len());
        for doctor in doctors {
            if !doctor_index.contains_key(&doctor.id) {
                doctor_index.insert(doctor.id.clone(), unique.len());
                unique.push(doctor);
            }
        }

        let mut by_id = HashMap::with_capacity(dispensaries.len());
        for dispensary in dispensaries {
            by_id.entry(dispensary.id.clone()).or_insert(dispensary);
        }

        Self {
            doctors: unique,
            doctor_index,
            dispensaries: by_id,
            loaded_at: Utc::now(),
        }
    }

    /// Doctors in directory order.
    #[must_use]
    pub fn doctors(&self) -> &[Doctor] {
        &self.doctors
    }

    /// Look up a doctor by identifier.
    #[must_use]
    pub fn doctor(&self, id: &str) -> Option<&Doctor> {
        self.doctor_index.get(id).map(|&i| &self.doctors[i])
    }

    /// Look up a dispensary by identifier.
    #[must_use]
    pub fn dispensary(&self, id: &str) -> Option<&Dispensary> {
        self.dispensaries.get(id)
    }

    /// Number of dispensaries in the snapshot.
    #[must_use]
    pub fn dispensary_count(&self) -> usize {
        self.dispensaries.len()
    }

    /// When the snapshot was built.
    #[must_use]
    pub const fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Outcome of the most recent failed load, for callers queued behind it.
struct FailedLoad {
    attempt: u64,
    generation: u64,
    error: MedibookError,
}

/// Lazily-populated, explicitly-invalidated directory cache.
pub struct DirectoryCache<S> {
    source: S,
    snapshot: RwLock<Option<Arc<DirectorySnapshot>>>,
    load_lock: Mutex<Option<FailedLoad>>,
    generation: AtomicU64,
    attempts: AtomicU64,
}

impl<S: DirectorySource> DirectoryCache<S> {
    /// Create an empty cache over `source`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            snapshot: RwLock::new(None),
            load_lock: Mutex::new(None),
            generation: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
        }
    }

    /// The underlying directory source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Whether a snapshot is currently committed.
    pub fn is_loaded(&self) -> bool {
        self.current().is_some()
    }

    /// The committed snapshot, if any.
    pub fn current(&self) -> Option<Arc<DirectorySnapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Return the snapshot, fetching both directories concurrently if needed.
    ///
    /// # Errors
    ///
    /// Returns the first fetch error. Nothing is committed unless both
    /// fetches succeed. Callers queued behind a failing load receive a copy
    /// of its error rather than fetching again.
    pub async fn ensure_loaded(&self) -> Result<Arc<DirectorySnapshot>> {
        if let Some(snapshot) = self.current() {
            debug!("Directory cache hit");
            return Ok(snapshot);
        }

        // Attempts completed before we queued; anything newer was in flight.
        let seen = self.attempts.load(Ordering::Acquire);
        let mut last_failure = self.load_lock.lock().await;
        // Another caller may have finished loading while we waited.
        if let Some(snapshot) = self.current() {
            debug!("Directory cache filled by concurrent load");
            return Ok(snapshot);
        }

        let generation = self.generation.load(Ordering::Acquire);
        if let Some(failed) = last_failure
            .as_ref()
            .filter(|f| f.attempt > seen && f.generation == generation)
        {
            debug!("Concurrent directory load failed, sharing its error");
            return Err(failed.error.duplicate());
        }

        debug!("Directory cache miss, fetching directories");
        let fetched = tokio::try_join!(
            self.source.fetch_all_doctors(),
            self.source.fetch_all_dispensaries()
        );
        let attempt = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;

        let (doctors, dispensaries) = match fetched {
            Ok(lists) => {
                *last_failure = None;
                lists
            }
            Err(e) => {
                warn!(error = %e, "Directory fetch failed");
                *last_failure = Some(FailedLoad {
                    attempt,
                    generation,
                    error: e.duplicate(),
                });
                return Err(e);
            }
        };

        let snapshot = Arc::new(DirectorySnapshot::new(
            normalize_doctors(doctors),
            normalize_dispensaries(dispensaries),
        ));

        if self.generation.load(Ordering::Acquire) == generation {
            *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) =
                Some(Arc::clone(&snapshot));
            info!(
                doctors = snapshot.doctors().len(),
                dispensaries = snapshot.dispensary_count(),
                "Directory cache loaded"
            );
        } else {
            debug!("Directory cache invalidated during load; result not committed");
        }

        Ok(snapshot)
    }

    /// Drop the snapshot. The next `ensure_loaded` fetches again.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        debug!("Directory cache invalidated");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::directory::{RawDispensary, RawDoctor};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Directory source backed by JSON fixtures, counting fetches.
    #[derive(Default)]
    pub struct FakeDirectory {
        pub doctors: Vec<serde_json::Value>,
        pub dispensaries: Vec<serde_json::Value>,
        pub fail_dispensaries: bool,
        pub delay: Option<Duration>,
        pub doctor_fetches: AtomicUsize,
        pub dispensary_fetches: AtomicUsize,
    }

    impl FakeDirectory {
        pub fn new(doctors: Vec<serde_json::Value>, dispensaries: Vec<serde_json::Value>) -> Self {
            Self {
                doctors,
                dispensaries,
                ..Self::default()
            }
        }
    }

    impl DirectorySource for FakeDirectory {
        async fn fetch_all_doctors(&self) -> Result<Vec<RawDoctor>> {
            self.doctor_fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self
                .doctors
                .iter()
                .map(|v| serde_json::from_value(v.clone()).unwrap())
                .collect())
        }

        async fn fetch_all_dispensaries(&self) -> Result<Vec<RawDispensary>> {
            self.dispensary_fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_dispensaries {
                return Err(MedibookError::NetworkError("connection reset".into()));
            }
            Ok(self
                .dispensaries
                .iter()
                .map(|v| serde_json::from_value(v.clone()).unwrap())
                .collect())
        }
    }

    pub fn sample_directory() -> FakeDirectory {
        use serde_json::json;
        FakeDirectory::new(
            vec![
                json!({ "_id": "d1", "name": "Alice Perera", "dispensaries": ["x1"] }),
                json!({ "_id": "d2", "name": "Bob Alistair", "dispensaries": ["x2"] }),
            ],
            vec![
                json!({ "_id": "x1", "name": "Colombo Clinic", "latitude": 6.9, "longitude": 79.8 }),
                json!({ "_id": "x2", "name": "Dehiwala Care", "latitude": 6.95, "longitude": 79.85 }),
            ],
        )
    }

    #[tokio::test]
    async fn test_loads_once_and_reuses_snapshot() {
        let cache = DirectoryCache::new(sample_directory());
        assert!(!cache.is_loaded());

        let first = cache.ensure_loaded().await.unwrap();
        let second = cache.ensure_loaded().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.doctors().len(), 2);
        assert_eq!(cache.source().doctor_fetches.load(Ordering::SeqCst), 1);
        assert_eq!(cache.source().dispensary_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_commits_nothing() {
        let mut source = sample_directory();
        source.fail_dispensaries = true;
        let cache = DirectoryCache::new(source);

        let err = cache.ensure_loaded().await.unwrap_err();
        assert!(err.is_network_error());
        assert!(!cache.is_loaded());
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let cache = DirectoryCache::new(sample_directory());
        cache.ensure_loaded().await.unwrap();

        cache.invalidate();
        assert!(!cache.is_loaded());

        cache.ensure_loaded().await.unwrap();
        assert_eq!(cache.source().doctor_fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_fetch() {
        let mut source = sample_directory();
        source.delay = Some(Duration::from_millis(50));
        let cache = DirectoryCache::new(source);

        let (a, b, c) = tokio::join!(
            cache.ensure_loaded(),
            cache.ensure_loaded(),
            cache.ensure_loaded()
        );

        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert!(c.is_ok());
        assert_eq!(cache.source().doctor_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_failed_fetch() {
        let mut source = sample_directory();
        source.fail_dispensaries = true;
        source.delay = Some(Duration::from_millis(50));
        let cache = DirectoryCache::new(source);

        let (a, b, c) = tokio::join!(
            cache.ensure_loaded(),
            cache.ensure_loaded(),
            cache.ensure_loaded()
        );

        for result in [a, b, c] {
            assert!(result.unwrap_err().is_network_error());
        }
        assert_eq!(cache.source().dispensary_fetches.load(Ordering::SeqCst), 1);
        assert!(!cache.is_loaded());

        // A caller arriving after the failure retries.
        assert!(cache.ensure_loaded().await.is_err());
        assert_eq!(cache.source().dispensary_fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_during_load_is_not_overwritten() {
        let mut source = sample_directory();
        source.delay = Some(Duration::from_millis(50));
        let cache = DirectoryCache::new(source);

        let (loaded, ()) = tokio::join!(cache.ensure_loaded(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cache.invalidate();
        });

        assert!(loaded.is_ok());
        assert!(!cache.is_loaded());
    }

    #[test]
    fn test_snapshot_lookup_and_duplicates() {
        let doctor = |id: &str, name: &str| Doctor {
            id: id.into(),
            name: name.into(),
            specialization: String::new(),
            qualifications: Vec::new(),
            dispensary_ids: Vec::new(),
        };
        let snapshot = DirectorySnapshot::new(
            vec![doctor("d1", "First"), doctor("d1", "Duplicate"), doctor("d2", "Second")],
            Vec::new(),
        );

        assert_eq!(snapshot.doctors().len(), 2);
        assert_eq!(snapshot.doctor("d1").unwrap().name, "First");
        assert!(snapshot.dispensary("x1").is_none());
    }
}
