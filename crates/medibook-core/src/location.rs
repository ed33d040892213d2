//! Device location access.

use std::future::Future;

use tracing::debug;

use crate::error::{MedibookError, Result};
use crate::geo::Coordinate;

/// Platform location service.
pub trait LocationProvider: Send + Sync {
    /// Whether foreground location access is already granted.
    fn check_permission(&self) -> impl Future<Output = bool> + Send;

    /// Ask the user for access; resolves to whether it was granted.
    fn request_permission(&self) -> impl Future<Output = bool> + Send;

    /// Read the current position. Only called once permission is granted.
    fn current_coordinate(&self) -> impl Future<Output = Result<Coordinate>> + Send;
}

/// Check permission, request it if missing, then read the position.
///
/// # Errors
///
/// Returns [`MedibookError::PermissionDenied`] if access is refused, or the
/// provider's error if no position can be read.
pub async fn acquire_location<L: LocationProvider>(provider: &L) -> Result<Coordinate> {
    if !provider.check_permission().await {
        debug!("Location permission missing, requesting");
        if !provider.request_permission().await {
            return Err(MedibookError::PermissionDenied);
        }
    }
    provider.current_coordinate().await
}

/// A provider that always reports the same position, or none.
///
/// With no position it behaves like a device where access was refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLocation {
    coordinate: Option<Coordinate>,
}

impl StaticLocation {
    /// A provider fixed at `coordinate`.
    #[must_use]
    pub const fn at(coordinate: Coordinate) -> Self {
        Self {
            coordinate: Some(coordinate),
        }
    }

    /// A provider with location access refused.
    #[must_use]
    pub const fn denied() -> Self {
        Self { coordinate: None }
    }
}

impl LocationProvider for StaticLocation {
    async fn check_permission(&self) -> bool {
        self.coordinate.is_some()
    }

    async fn request_permission(&self) -> bool {
        self.coordinate.is_some()
    }

    async fn current_coordinate(&self) -> Result<Coordinate> {
        self.coordinate.ok_or(MedibookError::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct PromptingLocation {
        grant_on_request: bool,
        granted: AtomicBool,
        requests: AtomicUsize,
    }

    impl LocationProvider for PromptingLocation {
        async fn check_permission(&self) -> bool {
            self.granted.load(Ordering::SeqCst)
        }

        async fn request_permission(&self) -> bool {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.granted.store(self.grant_on_request, Ordering::SeqCst);
            self.grant_on_request
        }

        async fn current_coordinate(&self) -> Result<Coordinate> {
            Ok(Coordinate::new(6.9, 79.8))
        }
    }

    #[tokio::test]
    async fn test_requests_permission_when_missing() {
        let provider = PromptingLocation {
            grant_on_request: true,
            granted: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
        };

        let coord = acquire_location(&provider).await.unwrap();
        assert_eq!(coord, Coordinate::new(6.9, 79.8));
        assert_eq!(provider.requests.load(Ordering::SeqCst), 1);

        acquire_location(&provider).await.unwrap();
        assert_eq!(provider.requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refused_request_is_permission_denied() {
        let provider = PromptingLocation {
            grant_on_request: false,
            granted: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
        };

        let err = acquire_location(&provider).await.unwrap_err();
        assert!(matches!(err, MedibookError::PermissionDenied));
    }

    #[tokio::test]
    async fn test_static_location() {
        let here = Coordinate::new(7.29, 80.63);
        assert_eq!(acquire_location(&StaticLocation::at(here)).await.unwrap(), here);
        assert!(acquire_location(&StaticLocation::denied()).await.is_err());
    }
}
