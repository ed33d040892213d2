//! Persisted authentication session.
//!
//! The session is stored as two values: `authToken` (the bearer token) and
//! `user` (the JSON user record returned by the API). A session exists only
//! when both are present and the user record parses.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::storage::KeyValueStore;

/// Storage key for the bearer token.
pub const TOKEN_KEY: &str = "authToken";

/// Storage key for the user record.
pub const USER_KEY: &str = "user";

/// A registered app user as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Document identifier.
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Mobile number, normalized (`07XXXXXXXX`).
    #[serde(default)]
    pub mobile: String,
    /// Email address, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A signed-in user and their token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// Bearer token sent with API requests.
    pub token: String,
    /// The signed-in user.
    pub user: User,
}

impl AuthSession {
    /// Identifier used to scope per-user data such as favorites.
    #[must_use]
    pub fn user_scope(&self) -> &str {
        &self.user.mobile
    }

    /// Load the stored session, if complete and readable.
    ///
    /// A partial or corrupt session reads as signed out.
    pub async fn load<S: KeyValueStore>(store: &S) -> Option<Self> {
        let token = match store.get(TOKEN_KEY).await {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read auth token");
                return None;
            }
        };
        let raw_user = match store.get(USER_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored user");
                return None;
            }
        };
        match serde_json::from_str(&raw_user) {
            Ok(user) => Some(Self { token, user }),
            Err(e) => {
                warn!(error = %e, "Stored user record is corrupt");
                None
            }
        }
    }

    /// Persist the session.
    ///
    /// # Errors
    ///
    /// Returns a storage error if either value cannot be written.
    pub async fn save<S: KeyValueStore>(&self, store: &S) -> Result<()> {
        store.set(TOKEN_KEY, &self.token).await?;
        store.set(USER_KEY, &serde_json::to_string(&self.user)?).await?;
        info!(user = %self.user.mobile, "Session saved");
        Ok(())
    }

    /// Remove any stored session.
    ///
    /// # Errors
    ///
    /// Returns a storage error if either value cannot be removed.
    pub async fn clear<S: KeyValueStore>(store: &S) -> Result<()> {
        store.remove(TOKEN_KEY).await?;
        store.remove(USER_KEY).await?;
        info!("Session cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn session() -> AuthSession {
        AuthSession {
            token: "token-123".into(),
            user: User {
                id: Some("u1".into()),
                name: "Nimal".into(),
                mobile: "0762199100".into(),
                email: None,
            },
        }
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let store = MemoryStore::new();
        assert!(AuthSession::load(&store).await.is_none());

        session().save(&store).await.unwrap();
        let loaded = AuthSession::load(&store).await.unwrap();
        assert_eq!(loaded, session());
        assert_eq!(loaded.user_scope(), "0762199100");

        AuthSession::clear(&store).await.unwrap();
        assert!(AuthSession::load(&store).await.is_none());
    }

    #[tokio::test]
    async fn test_partial_session_is_signed_out() {
        let store = MemoryStore::new();
        store.set(TOKEN_KEY, "token-123").await.unwrap();
        assert!(AuthSession::load(&store).await.is_none());

        store.set(USER_KEY, "{broken").await.unwrap();
        assert!(AuthSession::load(&store).await.is_none());
    }

    #[tokio::test]
    async fn test_reads_api_user_shape() {
        let store = MemoryStore::new();
        store.set(TOKEN_KEY, "t").await.unwrap();
        store
            .set(
                USER_KEY,
                r#"{"_id":"u9","name":"Kamala","mobile":"0771234567","role":null,"isActive":true}"#,
            )
            .await
            .unwrap();

        let loaded = AuthSession::load(&store).await.unwrap();
        assert_eq!(loaded.user.id.as_deref(), Some("u9"));
        assert_eq!(loaded.user.name, "Kamala");
    }
}
