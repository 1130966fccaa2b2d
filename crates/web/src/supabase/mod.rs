//! Remote backend gateway.
//!
//! # Architecture
//!
//! All persistence lives in an external backend-as-a-service exposing a
//! PostgREST-style table API (`/rest/v1/...`) and a GoTrue-style identity API
//! (`/auth/v1/...`). This module is the single access point through which the
//! application reads and writes the four remote collections (`places`,
//! `foods`, `favorites`, `history`) and the `profiles` table.
//!
//! The backend is the source of truth - NO local sync, no caching, direct API
//! calls on every page load. Only equality filters, ordering, and
//! single-row-or-null fetches are used; there are no transactions and no
//! batch writes.
//!
//! # Example
//!
//! ```rust,ignore
//! use nusantara_web::supabase::Supabase;
//!
//! let backend = Supabase::new(&config.supabase)?;
//!
//! // Catalog reads (anonymous)
//! let places = backend.list_items(ItemKind::Place).await?;
//! let item = backend.get_item(ItemKind::Food, &"abc123".into()).await?;
//!
//! // Identity + user-owned rows
//! let session = backend.sign_in("user@example.com", "secret").await?;
//! backend.add_favorite(&session.access_token, session.user.id.into(),
//!     ItemKind::Place, &item_id).await?;
//! ```

mod auth;

pub use auth::{AuthSession, AuthUser};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use nusantara_core::{Favorite, FavoriteId, HistoryEntry, HistoryId, Item, ItemId, ItemKind,
    Profile, UserId};

use crate::config::SupabaseConfig;

/// Request timeout for all backend calls.
///
/// A stalled call would otherwise leave the page loading forever; a bounded
/// wait turns that into an ordinary failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when talking to the remote backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// HTTP request failed (transport, DNS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The API returned an error payload.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// Message extracted from the error body, or the raw body.
        message: String,
    },

    /// The identity service rejected the credentials.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Sign-up succeeded but no session was issued.
    #[error("sign-up did not return a session (email confirmation pending)")]
    ConfirmationRequired,

    /// The backend base URL could not be combined with an API path.
    #[error("invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl BackendError {
    /// Whether the backend rejected the bearer token itself.
    ///
    /// Access tokens are issued without a refresh token and eventually
    /// expire; the table API then answers 401 on every user-scoped call.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }
}

/// Client for the remote backend.
///
/// Cheaply cloneable via `Arc`. Catalog reads go out with the anonymous key;
/// user-owned rows (`favorites`, `history`, `profiles`) are read and written
/// with the signed-in user's bearer token so the backend's row-level rules
/// apply.
#[derive(Clone)]
pub struct Supabase {
    inner: Arc<SupabaseInner>,
}

struct SupabaseInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: String,
}

/// New favorite row as sent to the backend.
#[derive(Debug, Serialize)]
struct NewFavorite<'a> {
    user_id: UserId,
    item_id: &'a ItemId,
    item_type: ItemKind,
}

/// New history row as sent to the backend.
#[derive(Debug, Serialize)]
struct NewVisit<'a> {
    user_id: UserId,
    item_id: &'a ItemId,
    item_type: ItemKind,
    visited_at: chrono::DateTime<Utc>,
}

/// Profile name patch.
#[derive(Debug, Serialize)]
struct ProfileNamePatch<'a> {
    full_name: &'a str,
}

impl Supabase {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &SupabaseConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(SupabaseInner {
                client,
                base_url: config.url.clone(),
                anon_key: config.anon_key.expose_secret().to_owned(),
            }),
        })
    }

    /// Build an absolute URL for an API path.
    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Base request with the headers every backend call needs.
    ///
    /// `token` is the user's access token when acting on their behalf; the
    /// anonymous key doubles as the bearer otherwise.
    fn request(&self, method: reqwest::Method, url: Url, token: Option<&str>) -> reqwest::RequestBuilder {
        let bearer = token.unwrap_or(&self.inner.anon_key);
        self.inner
            .client
            .request(method, url)
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(bearer)
    }

    /// Turn a non-success response into a [`BackendError::Api`].
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = parse_error_message(&body)
            .unwrap_or_else(|| body.chars().take(200).collect());
        tracing::warn!(status = %status, message = %message, "backend returned error");
        Err(BackendError::Api {
            status: status.as_u16(),
            message,
        })
    }

    // =========================================================================
    // Table API
    // =========================================================================

    /// Select rows from a table with equality/order filters.
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
        token: Option<&str>,
    ) -> Result<Vec<T>, BackendError> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        let response = self
            .request(reqwest::Method::GET, url, token)
            .query(query)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Insert one row into a table.
    async fn insert<T: Serialize + ?Sized>(
        &self,
        table: &str,
        row: &T,
        token: &str,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        let response = self
            .request(reqwest::Method::POST, url, Some(token))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Delete rows matching equality filters.
    async fn delete(
        &self,
        table: &str,
        query: &[(&str, String)],
        token: &str,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        let response = self
            .request(reqwest::Method::DELETE, url, Some(token))
            .query(query)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Patch rows matching equality filters.
    async fn patch<T: Serialize + ?Sized>(
        &self,
        table: &str,
        query: &[(&str, String)],
        body: &T,
        token: &str,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        let response = self
            .request(reqwest::Method::PATCH, url, Some(token))
            .header("Prefer", "return=minimal")
            .query(query)
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// All rows of one kind, highest rating first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the rows cannot be parsed.
    #[instrument(skip(self))]
    pub async fn list_items(&self, kind: ItemKind) -> Result<Vec<Item>, BackendError> {
        self.select(
            kind.table(),
            &[("select", "*".to_owned()), ("order", "rating.desc".to_owned())],
            None,
        )
        .await
    }

    /// One row by id, or `None` when it does not exist.
    ///
    /// Zero rows is not an error - the caller renders a not-found state.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the row cannot be parsed.
    #[instrument(skip(self), fields(kind = %kind, id = %id))]
    pub async fn get_item(&self, kind: ItemKind, id: &ItemId) -> Result<Option<Item>, BackendError> {
        let rows: Vec<Item> = self
            .select(
                kind.table(),
                &[
                    ("select", "*".to_owned()),
                    ("id", format!("eq.{id}")),
                    ("limit", "1".to_owned()),
                ],
                None,
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// All favorites owned by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the rows cannot be parsed.
    #[instrument(skip(self, token))]
    pub async fn list_favorites(
        &self,
        token: &str,
        user: UserId,
    ) -> Result<Vec<Favorite>, BackendError> {
        self.select(
            "favorites",
            &[
                ("select", "*".to_owned()),
                ("user_id", format!("eq.{user}")),
                ("order", "created_at.desc".to_owned()),
            ],
            Some(token),
        )
        .await
    }

    /// The user's favorite row for one item, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the row cannot be parsed.
    #[instrument(skip(self, token), fields(kind = %kind, item = %item))]
    pub async fn find_favorite(
        &self,
        token: &str,
        user: UserId,
        kind: ItemKind,
        item: &ItemId,
    ) -> Result<Option<Favorite>, BackendError> {
        let rows: Vec<Favorite> = self
            .select(
                "favorites",
                &[
                    ("select", "*".to_owned()),
                    ("user_id", format!("eq.{user}")),
                    ("item_id", format!("eq.{item}")),
                    ("item_type", format!("eq.{kind}")),
                    ("limit", "1".to_owned()),
                ],
                Some(token),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Mark an item as a favorite.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert is rejected or the request fails.
    #[instrument(skip(self, token), fields(kind = %kind, item = %item))]
    pub async fn add_favorite(
        &self,
        token: &str,
        user: UserId,
        kind: ItemKind,
        item: &ItemId,
    ) -> Result<(), BackendError> {
        self.insert(
            "favorites",
            &NewFavorite {
                user_id: user,
                item_id: item,
                item_type: kind,
            },
            token,
        )
        .await
    }

    /// Remove one favorite row by id.
    ///
    /// The owner filter keeps the delete inside the user's own rows even if
    /// the backend's row-level rules are lax.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(id = %id))]
    pub async fn remove_favorite(
        &self,
        token: &str,
        user: UserId,
        id: &FavoriteId,
    ) -> Result<(), BackendError> {
        self.delete(
            "favorites",
            &[("id", format!("eq.{id}")), ("user_id", format!("eq.{user}"))],
            token,
        )
        .await
    }

    /// Remove the user's favorite rows for one item.
    ///
    /// Uniqueness of (user, item) is not guaranteed server-side; deleting by
    /// item filter clears duplicates in one call.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(kind = %kind, item = %item))]
    pub async fn clear_favorite(
        &self,
        token: &str,
        user: UserId,
        kind: ItemKind,
        item: &ItemId,
    ) -> Result<(), BackendError> {
        self.delete(
            "favorites",
            &[
                ("user_id", format!("eq.{user}")),
                ("item_id", format!("eq.{item}")),
                ("item_type", format!("eq.{kind}")),
            ],
            token,
        )
        .await
    }

    // =========================================================================
    // Visit history
    // =========================================================================

    /// All history rows owned by a user, most recent visit first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the rows cannot be parsed.
    #[instrument(skip(self, token))]
    pub async fn list_history(
        &self,
        token: &str,
        user: UserId,
    ) -> Result<Vec<HistoryEntry>, BackendError> {
        self.select(
            "history",
            &[
                ("select", "*".to_owned()),
                ("user_id", format!("eq.{user}")),
                ("order", "visited_at.desc".to_owned()),
            ],
            Some(token),
        )
        .await
    }

    /// Record a visit to an item.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert is rejected or the request fails.
    #[instrument(skip(self, token), fields(kind = %kind, item = %item))]
    pub async fn add_visit(
        &self,
        token: &str,
        user: UserId,
        kind: ItemKind,
        item: &ItemId,
    ) -> Result<(), BackendError> {
        self.insert(
            "history",
            &NewVisit {
                user_id: user,
                item_id: item,
                item_type: kind,
                visited_at: Utc::now(),
            },
            token,
        )
        .await
    }

    /// Remove one history row by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(id = %id))]
    pub async fn remove_history(
        &self,
        token: &str,
        user: UserId,
        id: &HistoryId,
    ) -> Result<(), BackendError> {
        self.delete(
            "history",
            &[("id", format!("eq.{id}")), ("user_id", format!("eq.{user}"))],
            token,
        )
        .await
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    /// The user's profile row, or `None` when it does not exist.
    ///
    /// A missing row is possible after a half-failed sign-up; callers fall
    /// back to the identity's email.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the row cannot be parsed.
    #[instrument(skip(self, token))]
    pub async fn get_profile(
        &self,
        token: &str,
        user: UserId,
    ) -> Result<Option<Profile>, BackendError> {
        let rows: Vec<Profile> = self
            .select(
                "profiles",
                &[
                    ("select", "*".to_owned()),
                    ("id", format!("eq.{user}")),
                    ("limit", "1".to_owned()),
                ],
                Some(token),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Create the profile row for a freshly signed-up identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert is rejected or the request fails.
    #[instrument(skip(self, token, profile), fields(user = %profile.id))]
    pub async fn create_profile(&self, token: &str, profile: &Profile) -> Result<(), BackendError> {
        self.insert("profiles", profile, token).await
    }

    /// Update the display name on the user's profile row.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token, full_name))]
    pub async fn update_profile_name(
        &self,
        token: &str,
        user: UserId,
        full_name: &str,
    ) -> Result<(), BackendError> {
        self.patch(
            "profiles",
            &[("id", format!("eq.{user}"))],
            &ProfileNamePatch { full_name },
            token,
        )
        .await
    }
}

/// Extract a human-readable message from a backend error body.
///
/// The table API answers with `{"message": ...}`, the identity API with
/// `{"msg": ...}` or `{"error_description": ...}` depending on the endpoint.
fn parse_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for key in ["message", "msg", "error_description", "error"] {
        if let Some(message) = value.get(key).and_then(serde_json::Value::as_str) {
            return Some(message.to_owned());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_display() {
        let err = BackendError::Api {
            status: 404,
            message: "row not found".to_owned(),
        };
        assert_eq!(err.to_string(), "API error (404): row not found");

        assert_eq!(
            BackendError::InvalidCredentials.to_string(),
            "invalid email or password"
        );
    }

    #[test]
    fn only_401_api_errors_count_as_token_rejection() {
        let expired = BackendError::Api {
            status: 401,
            message: "JWT expired".to_owned(),
        };
        assert!(expired.is_unauthorized());

        let forbidden = BackendError::Api {
            status: 403,
            message: "permission denied".to_owned(),
        };
        assert!(!forbidden.is_unauthorized());
        assert!(!BackendError::InvalidCredentials.is_unauthorized());
    }

    #[test]
    fn error_message_extraction_covers_both_apis() {
        assert_eq!(
            parse_error_message(r#"{"message":"permission denied"}"#).as_deref(),
            Some("permission denied")
        );
        assert_eq!(
            parse_error_message(r#"{"error_description":"Invalid login credentials"}"#).as_deref(),
            Some("Invalid login credentials")
        );
        assert_eq!(
            parse_error_message(r#"{"msg":"User already registered"}"#).as_deref(),
            Some("User already registered")
        );
        assert_eq!(parse_error_message("not json"), None);
        assert_eq!(parse_error_message(r#"{"code":42}"#), None);
    }
}
