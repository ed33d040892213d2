//! HTTP client for the booking API.

use std::sync::{Arc, PoisonError, RwLock};

use medibook_core::api::{DirectorySource, NearbySource};
use medibook_core::booking::{AvailableDays, BookingConfirmation, BookingRequest, BookingSummary};
use medibook_core::config::ApiConfig;
use medibook_core::directory::{FeeSchedule, RawDispensary, RawDoctor, RawNearbyResponse};
use medibook_core::error::{MedibookError, Result};
use medibook_core::geo::Coordinate;
use medibook_core::session::User;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

// ============================================================================
// Wire types
// ============================================================================

/// Response of the OTP endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OtpResponse {
    /// Whether the submitted code was accepted. Only meaningful for verification.
    #[serde(default)]
    pub valid: bool,
    /// Server message, if any.
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of the OTP send and resend requests.
#[derive(Debug, Serialize)]
struct OtpRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    identifier: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    purpose: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct VerifyOtpRequest<'a> {
    identifier: &'a str,
    otp: &'a str,
}

/// Details collected by the registration screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    /// Full name.
    pub name: String,
    /// Normalized mobile number.
    pub mobile: String,
    /// Email; a placeholder derived from the mobile number is used when absent.
    pub email: Option<String>,
    /// Password; a fixed placeholder is used when absent.
    pub password: Option<String>,
}

/// Body of the sign-up request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignupRequest {
    name: String,
    email: String,
    password: String,
    mobile: String,
    role: Option<String>,
    dispensary_ids: Vec<String>,
    is_active: bool,
    last_login: Option<String>,
    nationality: &'static str,
}

impl From<&Registration> for SignupRequest {
    fn from(reg: &Registration) -> Self {
        Self {
            name: reg.name.trim().to_string(),
            email: reg
                .email
                .clone()
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| format!("{}@temp.com", reg.mobile)),
            password: reg
                .password
                .clone()
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| "temp123".to_string()),
            mobile: reg.mobile.clone(),
            role: None,
            dispensary_ids: Vec::new(),
            is_active: true,
            last_login: None,
            nationality: "sri_lanka",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// A list endpoint that answers either with a bare array or an envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "doctors", alias = "dispensaries", alias = "data")]
        items: Vec<T>,
    },
}

impl<T> Listing<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped { items } => items,
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for the booking API.
///
/// Cloning is cheap; clones share the connection pool and bearer token.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Arc<RwLock<Option<String>>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.token().is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client from the API configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MedibookError::ValidationError`] if the base URL is invalid,
    /// or [`MedibookError::NetworkError`] if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            MedibookError::ValidationError(format!("invalid base URL {}: {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(MedibookError::ValidationError(format!(
                "base URL cannot carry paths: {base_url}"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| MedibookError::NetworkError(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// The API root.
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The bearer token sent with requests, if any.
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Set or clear the bearer token.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| MedibookError::ValidationError("base URL cannot carry paths".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match self.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Request failed before a response arrived");
            MedibookError::NetworkError(e.without_url().to_string())
        })?;

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url().path(), "Response received");
        if status.is_success() {
            return Ok(response);
        }
        Err(error_from_response(response).await)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.execute(request).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| MedibookError::NetworkError(e.without_url().to_string()))?;
        serde_json::from_slice(&body).map_err(|e| MedibookError::Decode(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;
        self.fetch(self.request(Method::GET, url)).await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        self.fetch(self.request(Method::POST, url).json(body)).await
    }

    // ==================== Auth ====================

    /// Look up a registered user. Unknown numbers return `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Any failure other than 404.
    pub async fn find_user_by_mobile(&self, mobile: &str) -> Result<Option<User>> {
        match self.get(&["api", "users", "mobile", mobile]).await {
            Ok(user) => Ok(Some(user)),
            Err(MedibookError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Network, server and decode failures.
    pub async fn register(&self, registration: &Registration) -> Result<serde_json::Value> {
        self.post(
            &["api", "mobile", "auth", "signup-mobile"],
            &SignupRequest::from(registration),
        )
        .await
    }

    /// Send a one-time code to `identifier`.
    ///
    /// # Errors
    ///
    /// Network, server and decode failures.
    pub async fn send_otp(&self, identifier: &str) -> Result<OtpResponse> {
        let body = OtpRequest {
            kind: "mobile",
            identifier,
            purpose: Some(""),
        };
        self.post(&["api", "util", "send-otp"], &body).await
    }

    /// Check a one-time code.
    ///
    /// # Errors
    ///
    /// Network, server and decode failures. A wrong code is not an error;
    /// it yields `valid == false`.
    pub async fn verify_otp(&self, identifier: &str, otp: &str) -> Result<OtpResponse> {
        self.post(
            &["api", "util", "verify-otp"],
            &VerifyOtpRequest { identifier, otp },
        )
        .await
    }

    /// Send a fresh one-time code.
    ///
    /// # Errors
    ///
    /// Network, server and decode failures.
    pub async fn resend_otp(&self, identifier: &str) -> Result<OtpResponse> {
        let body = OtpRequest {
            kind: "mobile",
            identifier,
            purpose: None,
        };
        self.post(&["api", "util", "resend-otp"], &body).await
    }

    // ==================== Booking ====================

    /// Upcoming sessions of a doctor at a dispensary.
    ///
    /// # Errors
    ///
    /// Network, server and decode failures.
    pub async fn next_available_slots(
        &self,
        doctor_id: &str,
        dispensary_id: &str,
    ) -> Result<AvailableDays> {
        self.get(&["api", "timeslots", "next-available", doctor_id, dispensary_id])
            .await
    }

    /// Fees for a doctor at a dispensary.
    ///
    /// # Errors
    ///
    /// Network, server and decode failures.
    pub async fn fees(&self, doctor_id: &str, dispensary_id: &str) -> Result<FeeSchedule> {
        self.get(&["api", "doctor-dispensaries", "fees", doctor_id, dispensary_id])
            .await
    }

    /// Create a booking.
    ///
    /// # Errors
    ///
    /// Network, server and decode failures.
    pub async fn create_booking(&self, request: &BookingRequest) -> Result<BookingConfirmation> {
        self.post(&["api", "bookings"], request).await
    }

    /// Summary of a confirmed booking.
    ///
    /// # Errors
    ///
    /// Network, server and decode failures.
    pub async fn booking_summary(&self, transaction_id: &str) -> Result<BookingSummary> {
        self.get(&["api", "bookings", "summary", transaction_id])
            .await
    }
}

async fn error_from_response(response: Response) -> MedibookError {
    let status = response.status();
    let path = response.url().path().to_string();
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty());

    match status {
        StatusCode::UNAUTHORIZED => MedibookError::Unauthorized,
        StatusCode::NOT_FOUND => MedibookError::NotFound(message.unwrap_or(path)),
        _ => {
            let message = message.unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unexpected response")
                    .to_string()
            });
            warn!(status = status.as_u16(), %message, "Server returned an error");
            MedibookError::ServerError {
                status: status.as_u16(),
                message,
            }
        }
    }
}

impl DirectorySource for ApiClient {
    async fn fetch_all_doctors(&self) -> Result<Vec<RawDoctor>> {
        let listing: Listing<RawDoctor> = self.get(&["api", "doctors"]).await?;
        Ok(listing.into_items())
    }

    async fn fetch_all_dispensaries(&self) -> Result<Vec<RawDispensary>> {
        let listing: Listing<RawDispensary> = self.get(&["api", "dispensaries"]).await?;
        Ok(listing.into_items())
    }
}

impl NearbySource for ApiClient {
    async fn fetch_nearby_doctors(
        &self,
        origin: Coordinate,
        radius_km: f64,
        limit: u32,
    ) -> Result<RawNearbyResponse> {
        let mut url = self.endpoint(&["api", "location", "doctors-nearby"])?;
        url.query_pairs_mut()
            .append_pair("latitude", &origin.latitude.to_string())
            .append_pair("longitude", &origin.longitude.to_string())
            .append_pair("limit", &limit.to_string())
            .append_pair("maxDistance", &radius_km.to_string());
        self.fetch(self.request(Method::GET, url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: base.into(),
            ..ApiConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let api = client("http://localhost:5001");
        let url = api.endpoint(&["api", "users", "mobile", "07 62/1"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5001/api/users/mobile/07%2062%2F1");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let api = client("https://booking.example.lk/v2/");
        let url = api.endpoint(&["api", "doctors"]).unwrap();
        assert_eq!(url.as_str(), "https://booking.example.lk/v2/api/doctors");
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let err = ApiClient::new(&ApiConfig {
            base_url: "not a url".into(),
            ..ApiConfig::default()
        })
        .unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_token_shared_between_clones() {
        let api = client("http://localhost:5001");
        let clone = api.clone();
        api.set_token(Some("abc".into()));
        assert_eq!(clone.token().as_deref(), Some("abc"));
        assert!(format!("{clone:?}").contains("authenticated: true"));
    }

    #[test]
    fn test_signup_defaults() {
        let body = serde_json::to_value(SignupRequest::from(&Registration {
            name: " Nimal ".into(),
            mobile: "0762199100".into(),
            ..Registration::default()
        }))
        .unwrap();
        assert_eq!(body["name"], "Nimal");
        assert_eq!(body["email"], "0762199100@temp.com");
        assert_eq!(body["password"], "temp123");
        assert_eq!(body["nationality"], "sri_lanka");
        assert_eq!(body["isActive"], true);
        assert!(body["role"].is_null());
        assert_eq!(body["dispensaryIds"], serde_json::json!([]));
    }

    #[test]
    fn test_listing_accepts_both_shapes() {
        let bare: Listing<RawDispensary> =
            serde_json::from_str(r#"[{"_id":"x1","name":"A"}]"#).unwrap();
        let wrapped: Listing<RawDispensary> =
            serde_json::from_str(r#"{"dispensaries":[{"_id":"x1","name":"A"}],"count":1}"#)
                .unwrap();
        assert_eq!(bare.into_items().len(), 1);
        assert_eq!(wrapped.into_items().len(), 1);
    }
}
