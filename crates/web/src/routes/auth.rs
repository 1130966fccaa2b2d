//! Authentication route handlers.
//!
//! Sign-in, sign-up, and sign-out against the remote identity service. This
//! is the one surface where remote failures are shown to the user as a
//! message; everywhere else they collapse into empty or not-found states.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use nusantara_core::{Email, Profile, UserId};

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;
use crate::supabase::BackendError;

/// Minimum password length enforced before any remote call.
const MIN_PASSWORD_LENGTH: usize = 6;

// =============================================================================
// Form Types
// =============================================================================

/// Sign-in form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Sign-up form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

/// Query parameters for the auth page.
#[derive(Debug, Deserialize)]
pub struct AuthPageQuery {
    /// `register` switches the page to the sign-up form.
    pub mode: Option<String>,
    /// Error code from a failed command.
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Auth page template (sign-in and sign-up share one page).
#[derive(Template, WebTemplate)]
#[template(path = "auth.html")]
pub struct AuthTemplate {
    /// Whether the sign-up form is active.
    pub registering: bool,
    /// Message to display, if a previous attempt failed.
    pub error: Option<String>,
}

/// Map an error code from a redirect back to a user-facing message.
fn error_message(code: &str) -> String {
    match code {
        "credentials" => "Email atau password salah".to_owned(),
        "name_required" => "Nama lengkap harus diisi".to_owned(),
        "invalid_email" => "Email tidak valid".to_owned(),
        "password_too_short" => "Password minimal 6 karakter".to_owned(),
        "email_taken" => "Email sudah terdaftar".to_owned(),
        "confirmation" => "Pendaftaran berhasil, cek email Anda untuk konfirmasi".to_owned(),
        "profile_failed" => "Pendaftaran gagal, silakan coba lagi".to_owned(),
        _ => "Terjadi kesalahan".to_owned(),
    }
}

// =============================================================================
// Routes
// =============================================================================

/// Display the auth page.
pub async fn auth_page(Query(query): Query<AuthPageQuery>) -> impl IntoResponse {
    AuthTemplate {
        registering: query.mode.as_deref() == Some("register"),
        error: query.error.as_deref().map(error_message),
    }
}

/// Handle sign-in form submission.
///
/// Remote rejections redirect back with an error code; a failing session
/// store is a server fault and propagates as [`AppError::Internal`].
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let session_result = state.backend().sign_in(&form.email, &form.password).await;

    match session_result {
        Ok(auth) => {
            let email = auth
                .user
                .email
                .as_deref()
                .unwrap_or(&form.email)
                .to_owned();
            let Ok(email) = Email::parse(&email) else {
                tracing::warn!("Identity service returned an unparseable email");
                return Ok(Redirect::to("/auth?error=credentials").into_response());
            };

            let current = CurrentUser {
                id: UserId::new(auth.user.id),
                email,
                access_token: auth.access_token,
            };

            set_current_user(&session, &current)
                .await
                .map_err(|e| AppError::Internal(format!("session store: {e}")))?;

            set_sentry_user(&current.id, Some(current.email.as_str()));
            Ok(Redirect::to("/profile").into_response())
        }
        Err(BackendError::InvalidCredentials) => {
            tracing::warn!("Sign-in rejected");
            Ok(Redirect::to("/auth?error=credentials").into_response())
        }
        Err(e) => {
            tracing::warn!("Sign-in failed: {e}");
            Ok(Redirect::to("/auth?error=failed").into_response())
        }
    }
}

/// Handle sign-up form submission.
///
/// Local validation runs before any remote call. The remote flow is
/// identity-then-profile; when the profile insert fails the just-issued
/// session is revoked (best effort) and the failure is surfaced.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let full_name = form.full_name.trim();
    if full_name.is_empty() {
        return Ok(Redirect::to("/auth?mode=register&error=name_required").into_response());
    }
    if form.password.len() < MIN_PASSWORD_LENGTH {
        return Ok(Redirect::to("/auth?mode=register&error=password_too_short").into_response());
    }
    let Ok(email) = Email::parse(form.email.trim()) else {
        return Ok(Redirect::to("/auth?mode=register&error=invalid_email").into_response());
    };

    let auth = match state.backend().sign_up(email.as_str(), &form.password).await {
        Ok(auth) => auth,
        Err(BackendError::ConfirmationRequired) => {
            return Ok(Redirect::to("/auth?error=confirmation").into_response());
        }
        Err(e) => {
            tracing::warn!("Sign-up failed: {e}");
            let code = if e.to_string().to_lowercase().contains("already") {
                "email_taken"
            } else {
                "failed"
            };
            return Ok(Redirect::to(&format!("/auth?mode=register&error={code}")).into_response());
        }
    };

    let user_id = UserId::new(auth.user.id);
    let profile = Profile {
        id: user_id,
        full_name: full_name.to_owned(),
        email: email.to_string(),
    };

    if let Err(e) = state.backend().create_profile(&auth.access_token, &profile).await {
        tracing::error!("Profile creation failed after sign-up: {e}");
        // Compensating action: revoke the session we just obtained. The
        // identity itself cannot be deleted with the anonymous key.
        if let Err(revoke_err) = state.backend().sign_out(&auth.access_token).await {
            tracing::warn!("Failed to revoke session after half-failed sign-up: {revoke_err}");
        }
        return Ok(Redirect::to("/auth?mode=register&error=profile_failed").into_response());
    }

    let current = CurrentUser {
        id: user_id,
        email,
        access_token: auth.access_token,
    };

    set_current_user(&session, &current)
        .await
        .map_err(|e| AppError::Internal(format!("session store: {e}")))?;

    set_sentry_user(&current.id, Some(current.email.as_str()));
    Ok(Redirect::to("/profile").into_response())
}

/// Handle sign-out.
///
/// Clears the session and revokes the remote token (best effort).
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    if let Ok(Some(user)) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
    {
        if let Err(e) = state.backend().sign_out(&user.access_token).await {
            tracing::warn!("Failed to revoke backend session: {e}");
        }
    }

    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {e}");
    }

    // Also destroy the entire session
    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {e}");
    }

    clear_sentry_user();
    Redirect::to("/").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_map_to_messages() {
        assert_eq!(error_message("name_required"), "Nama lengkap harus diisi");
        assert_eq!(error_message("credentials"), "Email atau password salah");
        assert_eq!(error_message("something_else"), "Terjadi kesalahan");
    }
}
