//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use nusantara_core::{Email, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the signed-in user and to
/// authorize user-scoped backend calls on their behalf. The access token is
/// only ever held server-side; it never reaches the browser.
///
/// No refresh token is kept, so the backend token can expire before the
/// session does. The profile page treats a 401 from the table API as the end
/// of the session and redirects to the auth page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Identity subject.
    pub id: UserId,
    /// Email on the identity.
    pub email: Email,
    /// Backend access token issued at sign-in.
    pub access_token: String,
}

/// Session keys for authentication data.
pub mod session_keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";
}
