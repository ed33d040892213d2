//! Contracts for the remote booking API.
//!
//! The core never talks HTTP itself. These traits are implemented by
//! `medibook-client` and by in-memory fakes in tests. Implementations return
//! raw wire shapes; normalization happens in the core.

use std::future::Future;
use std::sync::Arc;

use crate::directory::{RawDispensary, RawDoctor, RawNearbyResponse};
use crate::error::Result;
use crate::geo::Coordinate;

/// Bulk directory endpoints used by manual search.
pub trait DirectorySource: Send + Sync {
    /// Fetch every doctor.
    fn fetch_all_doctors(&self) -> impl Future<Output = Result<Vec<RawDoctor>>> + Send;

    /// Fetch every dispensary.
    fn fetch_all_dispensaries(&self) -> impl Future<Output = Result<Vec<RawDispensary>>> + Send;
}

/// Server-side proximity search.
pub trait NearbySource: Send + Sync {
    /// Doctors within `radius_km` of `origin`, ranked by the server.
    fn fetch_nearby_doctors(
        &self,
        origin: Coordinate,
        radius_km: f64,
        limit: u32,
    ) -> impl Future<Output = Result<RawNearbyResponse>> + Send;
}

impl<T: DirectorySource> DirectorySource for Arc<T> {
    fn fetch_all_doctors(&self) -> impl Future<Output = Result<Vec<RawDoctor>>> + Send {
        (**self).fetch_all_doctors()
    }

    fn fetch_all_dispensaries(&self) -> impl Future<Output = Result<Vec<RawDispensary>>> + Send {
        (**self).fetch_all_dispensaries()
    }
}

impl<T: NearbySource> NearbySource for Arc<T> {
    fn fetch_nearby_doctors(
        &self,
        origin: Coordinate,
        radius_km: f64,
        limit: u32,
    ) -> impl Future<Output = Result<RawNearbyResponse>> + Send {
        (**self).fetch_nearby_doctors(origin, radius_km, limit)
    }
}
