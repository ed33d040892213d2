//! Per-user favorite doctor/dispensary pairs.
//!
//! Favorites live in the key-value store under `favorites_<userId>`. Each
//! entry is identified by the composite key `<doctorId>_<dispensaryId>` and
//! keeps a copy of the display fields taken when it was added, so the list
//! renders without a round trip and survives directory changes.
//!
//! # Storage layout
//!
//! ```json
//! { "version": 1, "entries": [ { "id": "d1_x1", "doctor": {...}, "dispensary": {...}, "addedAt": "..." } ] }
//! ```
//!
//! A bare JSON array is the unversioned layout (version 0) and is upgraded on
//! the next write. Entries this version cannot parse are carried through
//! writes untouched rather than dropped, and fields of parsed entries that
//! are not modelled here are written back as they were read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::directory::{AvailabilityEntry, Dispensary, Doctor};
use crate::error::{MedibookError, Result};
use crate::storage::KeyValueStore;

/// Current on-disk layout version.
pub const FAVORITES_VERSION: u32 = 1;

/// Separator between the doctor and dispensary parts of a composite key.
pub const COMPOSITE_KEY_SEPARATOR: char = '_';

/// Storage key holding a user's favorites.
#[must_use]
pub fn favorites_key(user_id: &str) -> String {
    format!("favorites_{user_id}")
}

/// Build the composite favorite key.
#[must_use]
pub fn composite_key(doctor_id: &str, dispensary_id: &str) -> String {
    format!("{doctor_id}{COMPOSITE_KEY_SEPARATOR}{dispensary_id}")
}

/// Split a composite key into `(doctor_id, dispensary_id)`.
///
/// # Errors
///
/// Returns [`MedibookError::ValidationError`] when the separator is missing or
/// either side is empty.
pub fn parse_composite_key(key: &str) -> Result<(String, String)> {
    match key.split_once(COMPOSITE_KEY_SEPARATOR) {
        Some((doctor, dispensary)) if !doctor.is_empty() && !dispensary.is_empty() => {
            Ok((doctor.to_string(), dispensary.to_string()))
        }
        _ => Err(MedibookError::ValidationError(format!(
            "'{key}' is not a <doctorId>_<dispensaryId> favorite key"
        ))),
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Doctor fields captured when a favorite is added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteDoctor {
    /// Document identifier.
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Plain identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Specialization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    /// Stored fields not modelled above, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FavoriteDoctor {
    /// Resolve the identifier: `_id`, then `id`.
    #[must_use]
    pub fn resolve_id(&self) -> Option<String> {
        non_empty(self.object_id.as_ref()).or_else(|| non_empty(self.id.as_ref()))
    }
}

impl From<&Doctor> for FavoriteDoctor {
    fn from(doctor: &Doctor) -> Self {
        Self {
            object_id: Some(doctor.id.clone()),
            id: None,
            name: Some(doctor.name.clone()),
            specialization: Some(doctor.specialization.clone()),
            extra: Map::new(),
        }
    }
}

/// Dispensary fields captured when a favorite is added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteDispensary {
    /// Explicit dispensary identifier (preferred).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispensary_id: Option<String>,
    /// Generic document identifier.
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Directory-view name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Availability-view name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispensary_name: Option<String>,
    /// Directory-view address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Availability-view address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispensary_address: Option<String>,
    /// Stored fields not modelled above, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FavoriteDispensary {
    /// Resolve the identifier: `dispensaryId`, then `_id`.
    #[must_use]
    pub fn resolve_id(&self) -> Option<String> {
        non_empty(self.dispensary_id.as_ref()).or_else(|| non_empty(self.object_id.as_ref()))
    }

    /// Name for display, whichever variant was captured.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.dispensary_name.as_deref())
            .unwrap_or_default()
    }

    /// Address for display, whichever variant was captured.
    #[must_use]
    pub fn display_address(&self) -> &str {
        self.address
            .as_deref()
            .or(self.dispensary_address.as_deref())
            .unwrap_or_default()
    }
}

impl From<&Dispensary> for FavoriteDispensary {
    fn from(dispensary: &Dispensary) -> Self {
        Self {
            dispensary_id: Some(dispensary.id.clone()),
            name: Some(dispensary.name.clone()),
            address: Some(dispensary.address.clone()),
            ..Self::default()
        }
    }
}

impl From<&AvailabilityEntry> for FavoriteDispensary {
    fn from(entry: &AvailabilityEntry) -> Self {
        Self::from(&entry.dispensary)
    }
}

/// A stored favorite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    /// Composite key `<doctorId>_<dispensaryId>`.
    #[serde(default)]
    pub id: String,
    /// Doctor snapshot.
    #[serde(default)]
    pub doctor: FavoriteDoctor,
    /// Dispensary snapshot.
    #[serde(default)]
    pub dispensary: FavoriteDispensary,
    /// When the favorite was added.
    #[serde(default)]
    pub added_at: DateTime<Utc>,
    /// Stored fields not modelled above, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FavoriteEntry {
    /// Recover `(doctor_id, dispensary_id)` from the snapshots, falling back
    /// to the composite key for whichever side is missing.
    #[must_use]
    pub fn resolved_ids(&self) -> Option<(String, String)> {
        let from_key = parse_composite_key(&self.id).ok();
        let doctor = self
            .doctor
            .resolve_id()
            .or_else(|| from_key.as_ref().map(|(d, _)| d.clone()))?;
        let dispensary = self
            .dispensary
            .resolve_id()
            .or_else(|| from_key.map(|(_, x)| x))?;
        Some((doctor, dispensary))
    }

    /// Whether the entry can be shown and acted upon.
    #[must_use]
    pub fn is_displayable(&self) -> bool {
        self.resolved_ids().is_some()
    }
}

/// Hide entries whose identifiers cannot be recovered. Nothing is deleted.
#[must_use]
pub fn displayable(entries: Vec<FavoriteEntry>) -> Vec<FavoriteEntry> {
    let total = entries.len();
    let shown: Vec<FavoriteEntry> = entries
        .into_iter()
        .filter(FavoriteEntry::is_displayable)
        .collect();
    if shown.len() != total {
        debug!(hidden = total - shown.len(), "Hiding favorites without identifiers");
    }
    shown
}

// ============================================================================
// Persisted layout
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredFavorite {
    Parsed(FavoriteEntry),
    Opaque(Value),
}

impl StoredFavorite {
    fn id(&self) -> Option<&str> {
        match self {
            Self::Parsed(entry) => Some(entry.id.as_str()),
            Self::Opaque(value) => value.get("id").and_then(Value::as_str),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredLayout {
    Versioned {
        version: u32,
        entries: Vec<StoredFavorite>,
    },
    Unversioned(Vec<StoredFavorite>),
}

#[derive(Serialize)]
struct StoredLayoutOut<'a> {
    version: u32,
    entries: &'a [StoredFavorite],
}

fn decode(raw: &str) -> Result<Vec<StoredFavorite>> {
    let layout: StoredLayout = serde_json::from_str(raw)?;
    Ok(match layout {
        StoredLayout::Versioned { version, entries } => {
            if version > FAVORITES_VERSION {
                debug!(version, "Reading favorites written by a newer version");
            }
            entries
        }
        StoredLayout::Unversioned(entries) => entries,
    })
}

fn encode(entries: &[StoredFavorite]) -> Result<String> {
    Ok(serde_json::to_string(&StoredLayoutOut {
        version: FAVORITES_VERSION,
        entries,
    })?)
}

// ============================================================================
// Store
// ============================================================================

/// Favorites over a [`KeyValueStore`], scoped by user identifier.
pub struct FavoritesStore<S> {
    store: S,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> FavoritesStore<S> {
    /// Create a favorites store over `store`.
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self, user_id: &str) -> Result<Vec<StoredFavorite>> {
        match self.store.get(&favorites_key(user_id)).await? {
            Some(raw) => decode(&raw),
            None => Ok(Vec::new()),
        }
    }

    async fn persist(&self, user_id: &str, entries: &[StoredFavorite]) -> Result<()> {
        self.store
            .set(&favorites_key(user_id), &encode(entries)?)
            .await
    }

    /// All favorites, most recently added first.
    ///
    /// Unreadable or corrupt storage yields an empty list.
    pub async fn list(&self, user_id: &str) -> Vec<FavoriteEntry> {
        match self.load(user_id).await {
            Ok(entries) => entries
                .into_iter()
                .filter_map(|e| match e {
                    StoredFavorite::Parsed(entry) => Some(entry),
                    StoredFavorite::Opaque(_) => None,
                })
                .collect(),
            Err(e) => {
                warn!(user = %user_id, error = %e, "Favorites unreadable, treating as empty");
                Vec::new()
            }
        }
    }

    /// Add a favorite and return the stored entry.
    ///
    /// # Errors
    ///
    /// - [`MedibookError::ValidationError`] if either identifier cannot be resolved
    /// - [`MedibookError::AlreadyExists`] if the pair is already a favorite
    /// - [`MedibookError::StorageError`] if storage cannot be read or written;
    ///   corrupt storage is never overwritten
    pub async fn add(
        &self,
        user_id: &str,
        doctor: FavoriteDoctor,
        dispensary: FavoriteDispensary,
    ) -> Result<FavoriteEntry> {
        let doctor_id = doctor.resolve_id().ok_or_else(|| {
            MedibookError::ValidationError("doctor identifier could not be resolved".into())
        })?;
        let dispensary_id = dispensary.resolve_id().ok_or_else(|| {
            MedibookError::ValidationError("dispensary identifier could not be resolved".into())
        })?;
        let id = composite_key(&doctor_id, &dispensary_id);

        let _guard = self.write_lock.lock().await;
        let mut entries = self.load(user_id).await?;
        if entries.iter().any(|e| e.id() == Some(id.as_str())) {
            return Err(MedibookError::AlreadyExists(id));
        }

        let entry = FavoriteEntry {
            id,
            doctor,
            dispensary,
            added_at: Utc::now(),
            extra: Map::new(),
        };
        entries.insert(0, StoredFavorite::Parsed(entry.clone()));
        self.persist(user_id, &entries).await?;

        info!(user = %user_id, favorite = %entry.id, "Favorite added");
        Ok(entry)
    }

    /// Remove a favorite. Removing an unknown id succeeds without writing.
    ///
    /// # Errors
    ///
    /// Returns [`MedibookError::StorageError`] if storage cannot be read or written.
    pub async fn remove(&self, user_id: &str, favorite_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load(user_id).await?;
        let before = entries.len();
        entries.retain(|e| e.id() != Some(favorite_id));

        if entries.len() == before {
            debug!(user = %user_id, favorite = %favorite_id, "Favorite not present");
            return Ok(());
        }

        self.persist(user_id, &entries).await?;
        info!(user = %user_id, favorite = %favorite_id, "Favorite removed");
        Ok(())
    }

    /// Whether the pair is a favorite. Storage errors read as `false`.
    pub async fn is_favorite(&self, user_id: &str, doctor_id: &str, dispensary_id: &str) -> bool {
        let id = composite_key(doctor_id, dispensary_id);
        match self.load(user_id).await {
            Ok(entries) => entries.iter().any(|e| e.id() == Some(id.as_str())),
            Err(e) => {
                debug!(user = %user_id, error = %e, "Favorite lookup failed");
                false
            }
        }
    }

    /// Delete every favorite of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`MedibookError::StorageError`] if the key cannot be removed.
    pub async fn clear(&self, user_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(&favorites_key(user_id)).await?;
        info!(user = %user_id, "Favorites cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    const USER: &str = "0762199100";

    fn doctor(id: &str) -> FavoriteDoctor {
        FavoriteDoctor {
            object_id: Some(id.into()),
            name: Some(format!("Dr. {id}")),
            ..FavoriteDoctor::default()
        }
    }

    fn dispensary(id: &str) -> FavoriteDispensary {
        FavoriteDispensary {
            dispensary_id: Some(id.into()),
            name: Some(format!("Clinic {id}")),
            ..FavoriteDispensary::default()
        }
    }

    fn stored(store: &FavoritesStore<MemoryStore>) -> &MemoryStore {
        &store.store
    }

    #[test]
    fn test_composite_key_round_trip() {
        assert_eq!(composite_key("d1", "x1"), "d1_x1");
        assert_eq!(
            parse_composite_key("d1_x1").unwrap(),
            ("d1".to_string(), "x1".to_string())
        );
        assert!(parse_composite_key("d1").is_err());
        assert!(parse_composite_key("_x1").is_err());
        assert!(parse_composite_key("d1_").is_err());
    }

    #[tokio::test]
    async fn test_add_then_is_favorite() {
        let favorites = FavoritesStore::new(MemoryStore::new());
        let entry = favorites.add(USER, doctor("d1"), dispensary("x1")).await.unwrap();

        assert_eq!(entry.id, "d1_x1");
        assert!(favorites.is_favorite(USER, "d1", "x1").await);
        assert!(!favorites.is_favorite(USER, "d1", "x2").await);
        assert!(!favorites.is_favorite("someone-else", "d1", "x1").await);
    }

    #[tokio::test]
    async fn test_duplicate_add_reports_already_exists() {
        let favorites = FavoritesStore::new(MemoryStore::new());
        favorites.add(USER, doctor("d1"), dispensary("x1")).await.unwrap();

        let err = favorites
            .add(USER, doctor("d1"), dispensary("x1"))
            .await
            .unwrap_err();

        assert!(matches!(err, MedibookError::AlreadyExists(ref id) if id == "d1_x1"));
        assert_eq!(favorites.list(USER).await.len(), 1);
    }

    #[tokio::test]
    async fn test_list_is_most_recent_first() {
        let favorites = FavoritesStore::new(MemoryStore::new());
        favorites.add(USER, doctor("d1"), dispensary("x1")).await.unwrap();
        favorites.add(USER, doctor("d2"), dispensary("x2")).await.unwrap();

        let ids: Vec<String> = favorites.list(USER).await.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["d2_x2", "d1_x1"]);
    }

    #[tokio::test]
    async fn test_remove_present_and_absent() {
        let favorites = FavoritesStore::new(MemoryStore::new());
        favorites.add(USER, doctor("d1"), dispensary("x1")).await.unwrap();
        favorites.add(USER, doctor("d2"), dispensary("x2")).await.unwrap();

        favorites.remove(USER, "d1_x1").await.unwrap();
        assert_eq!(favorites.list(USER).await.len(), 1);

        favorites.remove(USER, "nope_nope").await.unwrap();
        assert_eq!(favorites.list(USER).await.len(), 1);
    }

    #[tokio::test]
    async fn test_unresolvable_identifiers_fail_fast() {
        let favorites = FavoritesStore::new(MemoryStore::new());

        let err = favorites
            .add(USER, FavoriteDoctor::default(), dispensary("x1"))
            .await
            .unwrap_err();
        assert!(err.is_validation_error());

        let err = favorites
            .add(USER, doctor("d1"), FavoriteDispensary::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("dispensary"));
        assert!(favorites.list(USER).await.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_dispensary_id_wins() {
        let favorites = FavoritesStore::new(MemoryStore::new());
        let both = FavoriteDispensary {
            dispensary_id: Some("disp-9".into()),
            object_id: Some("link-3".into()),
            ..FavoriteDispensary::default()
        };

        let entry = favorites.add(USER, doctor("d1"), both).await.unwrap();
        assert_eq!(entry.id, "d1_disp-9");
    }

    #[tokio::test]
    async fn test_corrupt_storage_reads_as_empty_and_is_not_overwritten() {
        let favorites = FavoritesStore::new(MemoryStore::new());
        stored(&favorites)
            .set(&favorites_key(USER), "{not json")
            .await
            .unwrap();

        assert!(favorites.list(USER).await.is_empty());
        assert!(!favorites.is_favorite(USER, "d1", "x1").await);

        let err = favorites
            .add(USER, doctor("d1"), dispensary("x1"))
            .await
            .unwrap_err();
        assert!(err.is_storage_error());
        assert_eq!(
            stored(&favorites).get(&favorites_key(USER)).await.unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[tokio::test]
    async fn test_unversioned_layout_is_read_and_upgraded() {
        let favorites = FavoritesStore::new(MemoryStore::new());
        let legacy = json!([
            {
                "id": "d7_x7",
                "doctor": { "_id": "d7", "name": "Dr. Legacy", "specialization": "ENT" },
                "dispensary": { "_id": "x7", "dispensaryName": "Old Clinic", "dispensaryAddress": "Kandy" },
                "addedAt": "2024-05-01T10:00:00.000Z"
            }
        ]);
        stored(&favorites)
            .set(&favorites_key(USER), &legacy.to_string())
            .await
            .unwrap();

        let list = favorites.list(USER).await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].dispensary.display_name(), "Old Clinic");
        assert_eq!(list[0].dispensary.display_address(), "Kandy");

        favorites.add(USER, doctor("d1"), dispensary("x1")).await.unwrap();
        let raw = stored(&favorites).get(&favorites_key(USER)).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], json!(FAVORITES_VERSION));
        assert_eq!(value["entries"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rewrite_keeps_fields_of_older_entries() {
        let favorites = FavoritesStore::new(MemoryStore::new());
        let legacy = json!([
            {
                "id": "d7_x7",
                "doctor": {
                    "_id": "d7",
                    "name": "Dr. Legacy",
                    "qualifications": ["MBBS", "MD"],
                    "dispensaries": ["x7"]
                },
                "dispensary": {
                    "_id": "x7",
                    "name": "Old Clinic",
                    "address": "Kandy",
                    "location": { "type": "Point", "coordinates": [80.63, 7.29] }
                },
                "addedAt": "2024-05-01T10:00:00.000Z",
                "note": "kept"
            }
        ]);
        stored(&favorites)
            .set(&favorites_key(USER), &legacy.to_string())
            .await
            .unwrap();

        favorites.add(USER, doctor("d1"), dispensary("x1")).await.unwrap();

        let raw = stored(&favorites).get(&favorites_key(USER)).await.unwrap().unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        let old = &value["entries"][1];
        assert_eq!(old["id"], json!("d7_x7"));
        assert_eq!(old["doctor"]["qualifications"], json!(["MBBS", "MD"]));
        assert_eq!(old["doctor"]["dispensaries"], json!(["x7"]));
        assert_eq!(old["dispensary"]["location"]["coordinates"], json!([80.63, 7.29]));
        assert_eq!(old["note"], json!("kept"));

        let fresh = &value["entries"][0];
        assert!(fresh["doctor"].get("qualifications").is_none());
    }

    #[tokio::test]
    async fn test_unparseable_entries_survive_writes() {
        let favorites = FavoritesStore::new(MemoryStore::new());
        let layout = json!({
            "version": 1,
            "entries": [ { "id": "d5_x5", "addedAt": "not a date" } ]
        });
        stored(&favorites)
            .set(&favorites_key(USER), &layout.to_string())
            .await
            .unwrap();

        assert!(favorites.list(USER).await.is_empty());
        assert!(favorites.is_favorite(USER, "d5", "x5").await);

        favorites.add(USER, doctor("d1"), dispensary("x1")).await.unwrap();
        let raw = stored(&favorites).get(&favorites_key(USER)).await.unwrap().unwrap();
        assert!(raw.contains("not a date"));

        favorites.remove(USER, "d5_x5").await.unwrap();
        assert!(!favorites.is_favorite(USER, "d5", "x5").await);
    }

    #[test]
    fn test_displayable_recovers_ids_from_key() {
        let from_key = FavoriteEntry {
            id: "d1_x1".into(),
            doctor: FavoriteDoctor::default(),
            dispensary: FavoriteDispensary::default(),
            added_at: Utc::now(),
            extra: Map::new(),
        };
        assert_eq!(
            from_key.resolved_ids(),
            Some(("d1".to_string(), "x1".to_string()))
        );

        let hopeless = FavoriteEntry {
            id: "garbage".into(),
            ..from_key.clone()
        };
        let from_fields = FavoriteEntry {
            id: String::new(),
            doctor: doctor("d2"),
            dispensary: dispensary("x2"),
            added_at: Utc::now(),
            extra: Map::new(),
        };

        let shown = displayable(vec![from_key, hopeless, from_fields]);
        assert_eq!(shown.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_scope() {
        let favorites = FavoritesStore::new(MemoryStore::new());
        favorites.add(USER, doctor("d1"), dispensary("x1")).await.unwrap();
        favorites.add("0771111111", doctor("d1"), dispensary("x1")).await.unwrap();

        favorites.clear(USER).await.unwrap();
        assert!(favorites.list(USER).await.is_empty());
        assert_eq!(favorites.list("0771111111").await.len(), 1);
    }

    #[test]
    fn test_snapshot_from_directory_records() {
        let doc = Doctor {
            id: "d1".into(),
            name: "Alice Perera".into(),
            specialization: "Cardiology".into(),
            qualifications: vec![],
            dispensary_ids: vec!["x1".into()],
        };
        let disp = Dispensary {
            id: "x1".into(),
            name: "Colombo Clinic".into(),
            address: "1 Main St".into(),
            coordinate: None,
            fees: None,
        };
        assert_eq!(FavoriteDoctor::from(&doc).resolve_id().as_deref(), Some("d1"));
        let snap = FavoriteDispensary::from(&disp);
        assert_eq!(snap.resolve_id().as_deref(), Some("x1"));
        assert_eq!(snap.display_name(), "Colombo Clinic");
    }
}
