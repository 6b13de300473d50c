//! Client for the auth/session service.
//!
//! The service issues a session credential as a cookie on login; the
//! client carries a cookie store so subsequent calls replay it
//! ("include credentials" semantics).

use crate::config::AuthConfig;
use crate::error::{Result, SoraError};
use crate::session::{Language, Persona};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const AUTH_FALLBACK: &str = "authentication failed";
const AUTH_TIMEOUT: Duration = Duration::from_secs(30);

/// Account identity returned by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Server-side profile record attached to an account.
///
/// Displayed statistics are recomputed locally from history
/// ([`crate::history::stats`]); this record is kept for the login/check
/// payloads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    pub favorite_persona: Persona,
    pub preferred_language: Language,
    pub total_searches: i64,
}

/// Authenticated identity plus its profile record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthSession {
    pub user: User,
    pub profile: UserProfile,
}

/// Response of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisteredUser {
    pub message: String,
    pub user: User,
}

/// Cookie-session client for the `/auth/*` endpoints.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    /// Create a client for the configured auth service.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(AUTH_TIMEOUT)
            .build()
            .map_err(|e| SoraError::Config(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Whether the stored session cookie still authenticates.
    ///
    /// Returns `Ok(None)` when the service answers non-2xx (not signed in);
    /// transport failures are errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent.
    pub async fn check(&self) -> Result<Option<AuthSession>> {
        let url = format!("{}/auth/check", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SoraError::Auth(e.to_string()))?;

        if !response.status().is_success() {
            return Ok(None);
        }
        let session = response
            .json::<AuthSession>()
            .await
            .map_err(|e| SoraError::Auth(format!("malformed check response: {e}")))?;
        Ok(Some(session))
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `SoraError::Auth` with the server's `error` message when the
    /// body carries one.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<RegisteredUser> {
        let url = format!("{}/auth/register", self.base_url);
        let body = serde_json::json!({
            "username": username,
            "email": email,
            "password": password,
            "password_confirm": password_confirm,
        });
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SoraError::Auth(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(SoraError::Auth(auth_error(&body_text)));
        }
        response
            .json::<RegisteredUser>()
            .await
            .map_err(|e| SoraError::Auth(format!("malformed register response: {e}")))
    }

    /// Sign in; on success the session cookie is retained for later calls.
    ///
    /// # Errors
    ///
    /// Returns `SoraError::Auth` with the server's `error` message
    /// (`"Invalid credentials"` on a 401).
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthSession> {
        let url = format!("{}/auth/login", self.base_url);
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SoraError::Auth(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            debug!("login rejected with HTTP {}", status.as_u16());
            return Err(SoraError::Auth(auth_error(&body_text)));
        }
        response
            .json::<AuthSession>()
            .await
            .map_err(|e| SoraError::Auth(format!("malformed login response: {e}")))
    }

    /// Sign out, invalidating the stored session cookie server-side.
    ///
    /// # Errors
    ///
    /// Returns `SoraError::Auth` on a non-2xx response.
    pub async fn logout(&self) -> Result<()> {
        let url = format!("{}/auth/logout", self.base_url);
        let response = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| SoraError::Auth(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(SoraError::Auth(auth_error(&body_text)));
        }
        Ok(())
    }
}

/// Extract the `error` field from a JSON error body, else the fallback.
fn auth_error(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| AUTH_FALLBACK.to_owned())
}
