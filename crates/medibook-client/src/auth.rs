//! Mobile number sign-in with one-time codes.
//!
//! Flow: request a code, verify it, then look the user up by mobile number.
//! The session is persisted only when the code is valid and the user exists.
//! Any request answered with 401 signs the user out.

use medibook_core::error::{MedibookError, Result};
use medibook_core::mobile::{normalize_mobile_number, validate_sri_lankan_mobile};
use medibook_core::session::AuthSession;
use medibook_core::storage::KeyValueStore;
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::{ApiClient, OtpResponse, Registration};

/// Result of submitting a one-time code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Code accepted and the session stored.
    SignedIn(AuthSession),
    /// Code accepted but no account exists for the number.
    NotRegistered,
    /// Code refused.
    Rejected {
        /// Server explanation, if given.
        message: Option<String>,
    },
}

/// Sign-in, registration and session lifecycle.
pub struct AuthService<S> {
    api: ApiClient,
    store: S,
}

fn checked_mobile(mobile: &str) -> Result<String> {
    if !validate_sri_lankan_mobile(mobile) {
        return Err(MedibookError::ValidationError(
            "Please enter a valid Sri Lankan mobile number".into(),
        ));
    }
    Ok(normalize_mobile_number(mobile))
}

impl<S: KeyValueStore> AuthService<S> {
    /// Create a service storing its session in `store`.
    pub const fn new(api: ApiClient, store: S) -> Self {
        Self { api, store }
    }

    /// The API client, carrying the current bearer token.
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Load a stored session and attach its token to the client.
    pub async fn restore(&self) -> Option<AuthSession> {
        let session = AuthSession::load(&self.store).await;
        self.api.set_token(session.as_ref().map(|s| s.token.clone()));
        session
    }

    /// Send a one-time code to `mobile`.
    ///
    /// # Errors
    ///
    /// [`MedibookError::ValidationError`] for a malformed number, or the API error.
    pub async fn request_otp(&self, mobile: &str) -> Result<OtpResponse> {
        let mobile = checked_mobile(mobile)?;
        let response = self.api.send_otp(&mobile).await?;
        info!(%mobile, "One-time code requested");
        Ok(response)
    }

    /// Send a fresh one-time code to `mobile`.
    ///
    /// # Errors
    ///
    /// [`MedibookError::ValidationError`] for a malformed number, or the API error.
    pub async fn resend_otp(&self, mobile: &str) -> Result<OtpResponse> {
        let mobile = checked_mobile(mobile)?;
        self.api.resend_otp(&mobile).await
    }

    /// Submit a one-time code.
    ///
    /// # Errors
    ///
    /// [`MedibookError::ValidationError`] for a malformed number or empty code,
    /// API failures, or a storage error while saving the session.
    pub async fn verify(&self, mobile: &str, otp: &str) -> Result<Verification> {
        let mobile = checked_mobile(mobile)?;
        let otp = otp.trim();
        if otp.is_empty() {
            return Err(MedibookError::ValidationError("Please enter the code".into()));
        }

        let response = self.api.verify_otp(&mobile, otp).await?;
        if !response.valid {
            info!(%mobile, "One-time code rejected");
            return Ok(Verification::Rejected {
                message: response.message,
            });
        }

        let Some(user) = self.api.find_user_by_mobile(&mobile).await? else {
            info!(%mobile, "Verified number has no account");
            return Ok(Verification::NotRegistered);
        };

        let session = AuthSession {
            token: format!("token-{}", Uuid::new_v4()),
            user,
        };
        session.save(&self.store).await?;
        self.api.set_token(Some(session.token.clone()));
        info!(%mobile, "Signed in");
        Ok(Verification::SignedIn(session))
    }

    /// Create an account for `registration.mobile`.
    ///
    /// # Errors
    ///
    /// [`MedibookError::ValidationError`] for a missing name or malformed
    /// number, or the API error.
    pub async fn register(&self, registration: &Registration) -> Result<serde_json::Value> {
        if registration.name.trim().is_empty() {
            return Err(MedibookError::ValidationError("Name is required".into()));
        }
        let registration = Registration {
            mobile: checked_mobile(&registration.mobile)?,
            ..registration.clone()
        };
        let created = self.api.register(&registration).await?;
        info!(mobile = %registration.mobile, "Account created");
        Ok(created)
    }

    /// Remove the stored session and drop the client's token.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the session cannot be removed.
    pub async fn logout(&self) -> Result<()> {
        self.api.set_token(None);
        AuthSession::clear(&self.store).await
    }

    /// Pass `result` through, signing out first if it is
    /// [`MedibookError::Unauthorized`].
    ///
    /// # Errors
    ///
    /// Returns `result`'s error unchanged.
    pub async fn check<T>(&self, result: Result<T>) -> Result<T> {
        if matches!(result, Err(MedibookError::Unauthorized)) {
            warn!("Session rejected by server, signing out");
            if let Err(e) = self.logout().await {
                warn!(error = %e, "Failed to clear rejected session");
            }
        }
        result
    }
}
