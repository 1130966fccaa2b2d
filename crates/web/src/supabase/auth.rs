//! Identity API calls (GoTrue dialect).
//!
//! Credential sign-up, sign-in, and sign-out. The identity service owns the
//! accounts; this client only passes credentials through and keeps the
//! returned access token for the session.

use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use super::{BackendError, Supabase};

/// Identity subject as returned by the identity API.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    /// Subject uuid.
    pub id: Uuid,
    /// Email on the identity, when present.
    pub email: Option<String>,
}

/// An issued session: access token plus the identity it belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    /// Bearer token for user-scoped table calls.
    pub access_token: String,
    /// The signed-in identity.
    pub user: AuthUser,
}

/// Credential payload for sign-in and sign-up.
#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Sign-up response: a session when the instance auto-confirms, otherwise
/// just the created identity.
#[derive(Debug, Deserialize)]
struct SignUpResponse {
    access_token: Option<String>,
    user: Option<AuthUser>,
}

impl Supabase {
    /// Authenticate with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidCredentials`] when the identity service
    /// rejects the pair, or another [`BackendError`] on transport failure.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let url = self.endpoint("auth/v1/token")?;
        let response = self
            .request(reqwest::Method::POST, url, None)
            .query(&[("grant_type", "password")])
            .json(&Credentials { email, password })
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED
        {
            return Err(BackendError::InvalidCredentials);
        }
        let response = Self::check(response).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Create a new identity with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::ConfirmationRequired`] when the instance does
    /// not auto-confirm sign-ups (no session issued), or another
    /// [`BackendError`] when the identity cannot be created.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let url = self.endpoint("auth/v1/signup")?;
        let response = self
            .request(reqwest::Method::POST, url, None)
            .json(&Credentials { email, password })
            .send()
            .await?;
        let response = Self::check(response).await?;
        let text = response.text().await?;
        let parsed: SignUpResponse = serde_json::from_str(&text)?;

        match (parsed.access_token, parsed.user) {
            (Some(access_token), Some(user)) => Ok(AuthSession { access_token, user }),
            _ => Err(BackendError::ConfirmationRequired),
        }
    }

    /// Invalidate the remote session behind an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; callers treat revocation as
    /// best effort.
    #[instrument(skip(self, token))]
    pub async fn sign_out(&self, token: &str) -> Result<(), BackendError> {
        let url = self.endpoint("auth/v1/logout")?;
        let response = self
            .request(reqwest::Method::POST, url, Some(token))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
