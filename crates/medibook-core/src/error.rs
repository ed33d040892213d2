//! Unified error types for the medibook core library.
//!
//! This module provides a unified error type [`MedibookError`] covering every
//! failure mode of the client core. Configuration has its own specific error
//! type ([`ConfigError`](crate::config::ConfigError)) which converts into it.
//!
//! # Propagation
//!
//! Every fallible operation returns a [`Result`]. Callers decide whether to
//! surface a message or degrade silently: favorites and storage failures
//! degrade ([`MedibookError::should_degrade_silently`]), search and booking
//! failures are shown to the user.
//!
//! # Example
//!
//! ```rust
//! use medibook_core::error::{MedibookError, Result};
//!
//! fn require_id(id: &str) -> Result<&str> {
//!     if id.is_empty() {
//!         return Err(MedibookError::ValidationError("doctor id is empty".into()));
//!     }
//!     Ok(id)
//! }
//! ```

use thiserror::Error;

/// The unified error type for all medibook operations.
#[derive(Debug, Error)]
pub enum MedibookError {
    // =========================================================================
    // LOCATION ERRORS
    // =========================================================================
    /// The user refused (or has not granted) location access.
    #[error("Location permission denied. Enable location services or search by name instead.")]
    PermissionDenied,

    /// The device could not produce a coordinate.
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    // =========================================================================
    // REMOTE API ERRORS
    // =========================================================================
    /// The remote resource does not exist (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request never received a response.
    #[error("Network error: {0}. Check your connection and try again.")]
    NetworkError(String),

    /// The server answered with a non-success status.
    #[error("Server error ({status}): {message}")]
    ServerError {
        /// HTTP status code returned by the server.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// The server rejected the credentials (HTTP 401).
    #[error("Session expired or unauthorized. Please sign in again.")]
    Unauthorized,

    /// A response body could not be understood.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    // =========================================================================
    // LOCAL STATE ERRORS
    // =========================================================================
    /// Local persistence could not be read or written.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Input was malformed (unresolvable identifiers, bad form fields).
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// The favorite being added is already stored.
    #[error("Already in favorites: '{0}'")]
    AlreadyExists(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for medibook operations.
pub type Result<T> = std::result::Result<T, MedibookError>;

impl MedibookError {
    /// Returns `true` if this error came from talking to the remote API.
    #[inline]
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::NetworkError(_)
                | Self::ServerError { .. }
                | Self::Unauthorized
                | Self::Decode(_)
        )
    }

    /// Returns `true` if this error is related to local persistence.
    #[inline]
    #[must_use]
    pub const fn is_storage_error(&self) -> bool {
        matches!(self, Self::StorageError(_) | Self::IoError(_))
    }

    /// Returns `true` if this error was caused by malformed input.
    #[inline]
    #[must_use]
    pub const fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_) | Self::AlreadyExists(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns `true` if retrying the same operation may succeed.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::NetworkError(_) | Self::LocationUnavailable(_) => true,
            Self::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` for failures the UI should swallow rather than report.
    ///
    /// Favorites are a convenience feature; storage failures behind them
    /// degrade to "no favorites".
    #[inline]
    #[must_use]
    pub const fn should_degrade_silently(&self) -> bool {
        self.is_storage_error()
    }

    /// Returns a machine-readable error code.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::LocationUnavailable(_) => "LOCATION_UNAVAILABLE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::NetworkError(_) => "NETWORK_ERROR",
            Self::ServerError { .. } => "SERVER_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Decode(_) => "DECODE_ERROR",
            Self::StorageError(_) => "STORAGE_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }

    /// An equivalent error for another caller. I/O errors keep their kind
    /// and message.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        match self {
            Self::PermissionDenied => Self::PermissionDenied,
            Self::LocationUnavailable(m) => Self::LocationUnavailable(m.clone()),
            Self::NotFound(m) => Self::NotFound(m.clone()),
            Self::NetworkError(m) => Self::NetworkError(m.clone()),
            Self::ServerError { status, message } => Self::ServerError {
                status: *status,
                message: message.clone(),
            },
            Self::Unauthorized => Self::Unauthorized,
            Self::Decode(m) => Self::Decode(m.clone()),
            Self::StorageError(m) => Self::StorageError(m.clone()),
            Self::ValidationError(m) => Self::ValidationError(m.clone()),
            Self::AlreadyExists(m) => Self::AlreadyExists(m.clone()),
            Self::ConfigParseError(m) => Self::ConfigParseError(m.clone()),
            Self::ConfigValidationError(m) => Self::ConfigValidationError(m.clone()),
            Self::IoError(e) => Self::IoError(std::io::Error::new(e.kind(), e.to_string())),
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::config::ConfigError> for MedibookError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::Load(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::WriteError { path, source } => {
                Self::StorageError(format!("Failed to write {}: {}", path.display(), source))
            }
            ConfigError::SerializeError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

impl From<serde_json::Error> for MedibookError {
    fn from(err: serde_json::Error) -> Self {
        Self::StorageError(format!("Invalid JSON: {err}"))
    }
}

// =============================================================================
// TESTS
// =============================================================================
