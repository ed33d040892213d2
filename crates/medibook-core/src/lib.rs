//! # medibook-core
//!
//! Client-side core of the medibook doctor booking app.
//!
//! This crate provides:
//! - Great-circle distance between coordinates
//! - A session-scoped cache of the doctor and dispensary directory
//! - Local name search ranked by distance to the user
//! - Per-user favorites persisted in a key-value store
//! - Server-side proximity search and the home screen controller
//! - Mobile number helpers, auth session persistence and booking payloads
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`api`] - Traits for the directory and proximity endpoints
//! - [`booking`] - Time slots, booking form validation and payloads
//! - [`cache`] - Single-flight directory cache
//! - [`config`] - Application configuration loading, saving, and validation
//! - [`controller`] - Home screen orchestration (debounce, stale-result guards)
//! - [`directory`] - Canonical doctor and dispensary types and wire normalization
//! - [`error`] - Unified error types for the crate
//! - [`favorites`] - Versioned favorites storage
//! - [`geo`] - Coordinates and haversine distance
//! - [`location`] - Device location permission and lookup
//! - [`mobile`] - Sri Lankan mobile number validation and formatting
//! - [`nearby`] - Proximity search wrapper
//! - [`search`] - Manual search over the cached directory
//! - [`session`] - Persisted authentication session
//! - [`storage`] - Key-value stores backed by files or memory

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod api;
pub mod booking;
pub mod cache;
pub mod config;
pub mod controller;
pub mod directory;
pub mod error;
pub mod favorites;
pub mod geo;
pub mod location;
pub mod mobile;
pub mod nearby;
pub mod search;
pub mod session;
pub mod storage;

// Re-export primary types for convenience
pub use api::{DirectorySource, NearbySource};
pub use booking::{
    AvailableDays, BookingConfirmation, BookingForm, BookingRequest, BookingSummary, FieldError,
    TimeSlot, MIN_PATIENT_NAME_LEN,
};
pub use cache::{DirectoryCache, DirectorySnapshot};
pub use config::{
    default_config_path, ApiConfig, ConfigError, ConfigResult, MedibookConfig, NearbyConfig,
    SearchConfig, StorageConfig,
};
pub use controller::{ScreenController, ScreenParts, ScreenUpdate, SearchMode};
pub use directory::{
    AvailabilityEntry, Dispensary, Doctor, EnrichedDoctor, FeeSchedule, RawDispensary, RawDoctor,
    RawNearbyResponse,
};
pub use error::{MedibookError, Result};
pub use favorites::{
    composite_key, displayable, parse_composite_key, FavoriteDispensary, FavoriteDoctor,
    FavoriteEntry, FavoritesStore,
};
pub use geo::{distance, Coordinate, EARTH_RADIUS_KM};
pub use location::{acquire_location, LocationProvider, StaticLocation};
pub use mobile::{format_mobile_number, normalize_mobile_number, validate_sri_lankan_mobile};
pub use nearby::NearbyFetcher;
pub use search::SearchEngine;
pub use session::{AuthSession, User};
pub use storage::{default_data_dir, FileStore, KeyValueStore, MemoryStore};
