//! Proximity search delegated to the server.
//!
//! The server ranks results; this module only applies the configured radius
//! and limit and normalizes the response.

use tracing::debug;

use crate::api::NearbySource;
use crate::config::NearbyConfig;
use crate::directory::{normalize_nearby, EnrichedDoctor};
use crate::error::Result;
use crate::geo::Coordinate;

/// Thin wrapper over a [`NearbySource`].
pub struct NearbyFetcher<N> {
    source: N,
    config: NearbyConfig,
}

impl<N: NearbySource> NearbyFetcher<N> {
    /// Create a fetcher with the given radius and limit.
    pub const fn new(source: N, config: NearbyConfig) -> Self {
        Self { source, config }
    }

    /// The active radius and limit.
    pub const fn config(&self) -> &NearbyConfig {
        &self.config
    }

    /// Doctors near `origin`, in server order.
    ///
    /// # Errors
    ///
    /// Propagates the source's error.
    pub async fn fetch(&self, origin: Coordinate) -> Result<Vec<EnrichedDoctor>> {
        let raw = self
            .source
            .fetch_nearby_doctors(origin, self.config.radius_km, self.config.limit)
            .await?;
        let doctors = normalize_nearby(raw);
        debug!(
            latitude = origin.latitude,
            longitude = origin.longitude,
            results = doctors.len(),
            "Nearby doctors fetched"
        );
        Ok(doctors)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::directory::RawNearbyResponse;
    use crate::error::MedibookError;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Proximity source returning a fixed response and recording calls.
    #[derive(Default)]
    pub struct FakeNearby {
        pub response: serde_json::Value,
        pub fail: bool,
        pub delay: Option<Duration>,
        pub calls: Mutex<Vec<(Coordinate, f64, u32)>>,
    }

    impl NearbySource for FakeNearby {
        async fn fetch_nearby_doctors(
            &self,
            origin: Coordinate,
            radius_km: f64,
            limit: u32,
        ) -> Result<RawNearbyResponse> {
            self.calls.lock().unwrap().push((origin, radius_km, limit));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(MedibookError::ServerError {
                    status: 500,
                    message: "geo index unavailable".into(),
                });
            }
            Ok(serde_json::from_value(self.response.clone()).unwrap())
        }
    }

    pub fn sample_nearby() -> FakeNearby {
        FakeNearby {
            response: json!({
                "doctors": [
                    { "_id": "n1", "name": "Dr. Close", "availableAt": [ { "dispensaryId": "x1", "dispensaryName": "Near Clinic", "distance": 0.4 } ] },
                    { "_id": "n2", "name": "Dr. Further", "availableAt": [ { "dispensaryId": "x2", "dispensaryName": "Far Clinic", "distance": 7.9 } ] }
                ]
            }),
            ..FakeNearby::default()
        }
    }

    #[tokio::test]
    async fn test_passes_configured_radius_and_limit() {
        let fetcher = NearbyFetcher::new(
            sample_nearby(),
            NearbyConfig {
                radius_km: 5.0,
                limit: 3,
            },
        );
        let origin = Coordinate::new(6.9, 79.8);

        let doctors = fetcher.fetch(origin).await.unwrap();

        let ids: Vec<&str> = doctors.iter().map(|d| d.doctor.id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n2"]);
        let calls = fetcher.source.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(origin, 5.0, 3)]);
    }

    #[tokio::test]
    async fn test_propagates_errors() {
        let source = FakeNearby {
            fail: true,
            ..sample_nearby()
        };
        let fetcher = NearbyFetcher::new(source, NearbyConfig::default());
        let err = fetcher.fetch(Coordinate::new(0.0, 0.0)).await.unwrap_err();
        assert!(err.is_recoverable());
    }
}
