//! Doctor and dispensary records, and the normalization boundary.
//!
//! The booking API returns the same entities in several shapes: dispensary
//! identifiers appear as `dispensaryId`, `_id` or `id`; names as `name` or
//! `dispensaryName`; coordinates as flat fields or a GeoJSON point; and a
//! doctor's dispensaries as bare ids or embedded objects. The `Raw*` types
//! here accept every variant and are normalized exactly once, right after a
//! fetch, into the canonical [`Doctor`], [`Dispensary`] and
//! [`EnrichedDoctor`]. Nothing downstream looks at field-name variants.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geo::Coordinate;

// ============================================================================
// Canonical types
// ============================================================================

/// Fee breakdown for a doctor at a dispensary, in LKR.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeeSchedule {
    /// Consultation fee charged by the doctor.
    pub doctor_fee: f64,
    /// Facility fee charged by the dispensary.
    pub dispensary_fee: f64,
    /// Platform commission for the booking.
    pub booking_commission: f64,
    /// Amount payable.
    pub total_fee: f64,
}

/// A doctor as listed in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    /// Opaque identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Specialization, empty when unknown.
    pub specialization: String,
    /// Qualifications in display order.
    pub qualifications: Vec<String>,
    /// Identifiers of the dispensaries this doctor practices at.
    pub dispensary_ids: Vec<String>,
}

/// A dispensary (clinic) as listed in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispensary {
    /// Opaque identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Street address, empty when unknown.
    pub address: String,
    /// Location, absent when the record carries no usable coordinate.
    pub coordinate: Option<Coordinate>,
    /// Fees, absent in directory-only views.
    pub fees: Option<FeeSchedule>,
}

/// A doctor/dispensary pairing built fresh for each result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityEntry {
    /// Where the doctor is available.
    pub dispensary: Dispensary,
    /// Distance from the user in kilometers, when known.
    pub distance_km: Option<f64>,
    /// Fee snapshot for this pairing.
    pub fees: Option<FeeSchedule>,
}

/// A doctor together with the dispensaries they are available at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedDoctor {
    /// The matched doctor.
    pub doctor: Doctor,
    /// Availability, nearest first when distances are known.
    pub available_at: Vec<AvailabilityEntry>,
}

impl EnrichedDoctor {
    /// Distance to the first (nearest) dispensary, if known.
    #[must_use]
    pub fn nearest_distance(&self) -> Option<f64> {
        self.available_at.first().and_then(|a| a.distance_km)
    }
}

// ============================================================================
// Wire shapes
// ============================================================================

/// A GeoJSON point or a `{latitude, longitude}` object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLocation {
    /// GeoJSON order: `[longitude, latitude]`.
    #[serde(default)]
    pub coordinates: Option<Vec<f64>>,
    /// Latitude when sent as an object.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude when sent as an object.
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// A dispensary in any of the shapes the API produces.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDispensary {
    /// Explicit dispensary identifier (preferred).
    #[serde(default)]
    pub dispensary_id: Option<String>,
    /// Generic document identifier.
    #[serde(default, rename = "_id")]
    pub object_id: Option<String>,
    /// Plain identifier used by some views.
    #[serde(default)]
    pub id: Option<String>,
    /// Directory-view name.
    #[serde(default)]
    pub name: Option<String>,
    /// Availability-view name.
    #[serde(default)]
    pub dispensary_name: Option<String>,
    /// Directory-view address.
    #[serde(default)]
    pub address: Option<String>,
    /// Availability-view address.
    #[serde(default)]
    pub dispensary_address: Option<String>,
    /// Flat latitude.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Flat longitude.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Nested location.
    #[serde(default)]
    pub location: Option<RawLocation>,
    /// Fee breakdown.
    #[serde(default)]
    pub fees: Option<FeeSchedule>,
    /// Server-computed distance (proximity results only).
    #[serde(default)]
    pub distance: Option<f64>,
}

/// A doctor's reference to a dispensary: a bare id or an embedded record.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawDispensaryRef {
    /// Bare identifier.
    Id(String),
    /// Embedded dispensary.
    Embedded(Box<RawDispensary>),
}

/// A doctor in any of the shapes the API produces.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDoctor {
    /// Document identifier.
    #[serde(default, rename = "_id")]
    pub object_id: Option<String>,
    /// Plain identifier used by some views.
    #[serde(default)]
    pub id: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Specialization.
    #[serde(default)]
    pub specialization: Option<String>,
    /// Qualifications.
    #[serde(default)]
    pub qualifications: Option<Vec<String>>,
    /// Directory view: dispensary references.
    #[serde(default)]
    pub dispensaries: Option<Vec<RawDispensaryRef>>,
    /// Proximity view: embedded availability, nearest first.
    #[serde(default)]
    pub available_at: Option<Vec<RawDispensary>>,
}

/// Body of the proximity search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNearbyResponse {
    /// Ranked doctors.
    #[serde(default)]
    pub doctors: Vec<RawDoctor>,
}

// ============================================================================
// Normalization
// ============================================================================

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl RawLocation {
    fn coordinate(&self) -> Option<Coordinate> {
        let point = match (&self.coordinates, self.latitude, self.longitude) {
            (Some(pair), _, _) if pair.len() >= 2 => Coordinate::new(pair[1], pair[0]),
            (_, Some(lat), Some(lon)) => Coordinate::new(lat, lon),
            _ => return None,
        };
        point.is_valid().then_some(point)
    }
}

impl RawDispensary {
    /// Resolve the identifier: `dispensaryId`, then `_id`, then `id`.
    #[must_use]
    pub fn resolve_id(&self) -> Option<String> {
        non_empty(self.dispensary_id.as_ref())
            .or_else(|| non_empty(self.object_id.as_ref()))
            .or_else(|| non_empty(self.id.as_ref()))
    }

    /// Resolve a usable coordinate from flat or nested fields.
    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        if let (Some(lat), Some(lon)) = (self.latitude, self.longitude) {
            let point = Coordinate::new(lat, lon);
            if point.is_valid() {
                return Some(point);
            }
        }
        self.location.as_ref().and_then(RawLocation::coordinate)
    }

    /// Convert to the canonical shape; `None` when no identifier resolves.
    #[must_use]
    pub fn normalize(self) -> Option<Dispensary> {
        let id = self.resolve_id()?;
        let coordinate = self.coordinate();
        Some(Dispensary {
            id,
            name: self.name.or(self.dispensary_name).unwrap_or_default(),
            address: self.address.or(self.dispensary_address).unwrap_or_default(),
            coordinate,
            fees: self.fees,
        })
    }
}

impl RawDispensaryRef {
    /// Identifier of the referenced dispensary.
    #[must_use]
    pub fn resolve_id(&self) -> Option<String> {
        match self {
            Self::Id(id) => non_empty(Some(id)),
            Self::Embedded(raw) => raw.resolve_id(),
        }
    }
}

impl RawDoctor {
    /// Resolve the identifier: `_id`, then `id`.
    #[must_use]
    pub fn resolve_id(&self) -> Option<String> {
        non_empty(self.object_id.as_ref()).or_else(|| non_empty(self.id.as_ref()))
    }

    /// Convert to the canonical directory shape; `None` when no identifier resolves.
    #[must_use]
    pub fn normalize(self) -> Option<Doctor> {
        let id = self.resolve_id()?;
        let mut dispensary_ids: Vec<String> = self
            .dispensaries
            .iter()
            .flatten()
            .filter_map(RawDispensaryRef::resolve_id)
            .collect();
        dispensary_ids.extend(
            self.available_at
                .iter()
                .flatten()
                .filter_map(RawDispensary::resolve_id),
        );
        let mut seen = std::collections::HashSet::new();
        dispensary_ids.retain(|id| seen.insert(id.clone()));

        Some(Doctor {
            id,
            name: self.name.unwrap_or_default(),
            specialization: self.specialization.unwrap_or_default(),
            qualifications: self.qualifications.unwrap_or_default(),
            dispensary_ids,
        })
    }

    /// Convert a proximity-search record, keeping the server's availability order.
    #[must_use]
    pub fn into_enriched(self) -> Option<EnrichedDoctor> {
        let available = self.available_at.clone().unwrap_or_default();
        let doctor = self.normalize()?;
        let available_at = available
            .into_iter()
            .filter_map(|raw| {
                let distance_km = raw.distance.filter(|d| d.is_finite() && *d >= 0.0);
                let dispensary = raw.normalize()?;
                Some(AvailabilityEntry {
                    fees: dispensary.fees,
                    dispensary,
                    distance_km,
                })
            })
            .collect();
        Some(EnrichedDoctor {
            doctor,
            available_at,
        })
    }
}

/// Normalize a fetched doctor directory, dropping records without an identifier.
#[must_use]
pub fn normalize_doctors(raw: Vec<RawDoctor>) -> Vec<Doctor> {
    let total = raw.len();
    let doctors: Vec<Doctor> = raw.into_iter().filter_map(RawDoctor::normalize).collect();
    if doctors.len() != total {
        debug!(dropped = total - doctors.len(), "Dropped doctors without an identifier");
    }
    doctors
}

/// Normalize a fetched dispensary directory, dropping records without an identifier.
#[must_use]
pub fn normalize_dispensaries(raw: Vec<RawDispensary>) -> Vec<Dispensary> {
    let total = raw.len();
    let dispensaries: Vec<Dispensary> = raw
        .into_iter()
        .filter_map(RawDispensary::normalize)
        .collect();
    if dispensaries.len() != total {
        debug!(
            dropped = total - dispensaries.len(),
            "Dropped dispensaries without an identifier"
        );
    }
    dispensaries
}

/// Normalize a proximity-search response, preserving server ranking.
#[must_use]
pub fn normalize_nearby(raw: RawNearbyResponse) -> Vec<EnrichedDoctor> {
    raw.doctors
        .into_iter()
        .filter_map(RawDoctor::into_enriched)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dispensary(value: serde_json::Value) -> RawDispensary {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_dispensary_id_prefers_explicit_field() {
        let raw = dispensary(json!({ "_id": "obj-1", "dispensaryId": "disp-1" }));
        assert_eq!(raw.resolve_id().as_deref(), Some("disp-1"));

        let raw = dispensary(json!({ "_id": "obj-1" }));
        assert_eq!(raw.resolve_id().as_deref(), Some("obj-1"));

        let raw = dispensary(json!({ "id": "plain-1", "dispensaryId": "  " }));
        assert_eq!(raw.resolve_id().as_deref(), Some("plain-1"));

        assert!(dispensary(json!({ "name": "No id" })).resolve_id().is_none());
    }

    #[test]
    fn test_dispensary_name_and_address_variants() {
        let d = dispensary(json!({
            "dispensaryId": "x1",
            "dispensaryName": "City Care",
            "dispensaryAddress": "12 Galle Rd"
        }))
        .normalize()
        .unwrap();
        assert_eq!(d.name, "City Care");
        assert_eq!(d.address, "12 Galle Rd");
    }

    #[test]
    fn test_coordinate_from_flat_and_geojson() {
        let flat = dispensary(json!({ "_id": "x", "latitude": 6.9, "longitude": 79.8 }));
        assert_eq!(flat.coordinate(), Some(Coordinate::new(6.9, 79.8)));

        let geo = dispensary(json!({
            "_id": "x",
            "location": { "type": "Point", "coordinates": [79.85, 6.95] }
        }));
        assert_eq!(geo.coordinate(), Some(Coordinate::new(6.95, 79.85)));

        let bad = dispensary(json!({ "_id": "x", "latitude": 200.0, "longitude": 79.8 }));
        assert_eq!(bad.coordinate(), None);
    }

    #[test]
    fn test_doctor_references_mixed_shapes() {
        let raw: RawDoctor = serde_json::from_value(json!({
            "_id": "d1",
            "name": "Alice Perera",
            "qualifications": ["MBBS", "MD"],
            "dispensaries": ["x1", { "_id": "x2", "name": "Embedded" }, { "name": "no id" }, "x1"]
        }))
        .unwrap();

        let doctor = raw.normalize().unwrap();
        assert_eq!(doctor.id, "d1");
        assert_eq!(doctor.dispensary_ids, vec!["x1", "x2"]);
        assert_eq!(doctor.qualifications, vec!["MBBS", "MD"]);
        assert_eq!(doctor.specialization, "");
    }

    #[test]
    fn test_null_collections_are_empty() {
        let raw: RawDoctor =
            serde_json::from_value(json!({ "_id": "d1", "qualifications": null, "dispensaries": null }))
                .unwrap();
        let doctor = raw.normalize().unwrap();
        assert!(doctor.qualifications.is_empty());
        assert!(doctor.dispensary_ids.is_empty());
    }

    #[test]
    fn test_records_without_id_are_dropped() {
        let doctors = normalize_doctors(vec![
            RawDoctor {
                object_id: Some("d1".into()),
                ..RawDoctor::default()
            },
            RawDoctor::default(),
        ]);
        assert_eq!(doctors.len(), 1);

        let dispensaries = normalize_dispensaries(vec![RawDispensary::default()]);
        assert!(dispensaries.is_empty());
    }

    #[test]
    fn test_nearby_response_keeps_server_order() {
        let raw: RawNearbyResponse = serde_json::from_value(json!({
            "doctors": [
                {
                    "_id": "d2",
                    "name": "Bob",
                    "availableAt": [
                        {
                            "dispensaryId": "x2",
                            "dispensaryName": "Harbour Clinic",
                            "distance": 1.5,
                            "fees": { "doctorFee": 2000, "dispensaryFee": 500, "bookingCommission": 100, "totalFee": 2600 }
                        }
                    ],
                    "nearestDistance": 1.5
                },
                { "_id": "d1", "name": "Alice", "availableAt": [] }
            ]
        }))
        .unwrap();

        let doctors = normalize_nearby(raw);
        assert_eq!(doctors.len(), 2);
        assert_eq!(doctors[0].doctor.id, "d2");
        assert_eq!(doctors[0].nearest_distance(), Some(1.5));
        assert_eq!(doctors[0].doctor.dispensary_ids, vec!["x2"]);
        let fees = doctors[0].available_at[0].fees.unwrap();
        assert!((fees.total_fee - 2600.0).abs() < f64::EPSILON);
        assert_eq!(doctors[1].nearest_distance(), None);
    }
}
