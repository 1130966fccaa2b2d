//! Profile route handlers.
//!
//! These routes require authentication; unauthenticated visits redirect to
//! the auth page via the `RequireAuth` extractor.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use nusantara_core::{FavoriteId, HistoryId, Item, ItemKind};

use crate::error::clear_sentry_user;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::CurrentUser;
use crate::state::AppState;

/// A favorite resolved to its catalog row.
pub struct FavoriteRow {
    pub id: FavoriteId,
    pub kind: ItemKind,
    pub item: Item,
}

/// A history entry resolved to its catalog row.
pub struct HistoryRow {
    pub id: HistoryId,
    pub kind: ItemKind,
    pub item: Item,
    /// Visit date preformatted for display (dd/mm/yyyy).
    pub visited_on: String,
}

/// Profile page query parameters.
#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    /// `favorites` (default) or `history`.
    pub tab: Option<String>,
    /// Present when the name edit form should be shown.
    pub edit: Option<String>,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    /// Display name (falls back to the identity's email local part).
    pub name: String,
    /// Email shown under the name.
    pub email: String,
    /// Active tab: `favorites` or `history`.
    pub tab: String,
    /// Whether the inline name editor is open.
    pub editing: bool,
    pub favorites: Vec<FavoriteRow>,
    pub history: Vec<HistoryRow>,
}

/// Display name update form.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileForm {
    pub full_name: String,
}

/// Display the profile page.
///
/// Join rows are resolved to their items one by one; rows whose item no
/// longer exists are dropped from the view.
#[instrument(skip(state, user, session))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Query(query): Query<ProfileQuery>,
) -> Response {
    let backend = state.backend();
    let token = &user.access_token;

    // Tokens are issued without a refresh token; an expired one surfaces as
    // 401 on the first user-scoped read. End the stale session and
    // re-authenticate instead of rendering an empty profile.
    let profile = match backend.get_profile(token, user.id).await {
        Ok(profile) => profile,
        Err(e) if e.is_unauthorized() => {
            tracing::info!("Backend token no longer accepted, ending session");
            if let Err(flush_err) = session.flush().await {
                tracing::error!("Failed to flush session: {flush_err}");
            }
            clear_sentry_user();
            return Redirect::to("/auth").into_response();
        }
        Err(e) => {
            tracing::error!("Failed to fetch profile: {e}");
            None
        }
    };

    // A missing profile row is possible after a half-failed sign-up; fall
    // back to the identity's email.
    let name = profile
        .map(|profile| profile.full_name)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| user.email.to_string());

    let favorites = resolve_favorites(&state, &user).await;
    let history = resolve_history(&state, &user).await;

    let tab = match query.tab.as_deref() {
        Some("history") => "history",
        _ => "favorites",
    };

    ProfileTemplate {
        name,
        email: user.email.to_string(),
        tab: tab.to_owned(),
        editing: query.edit.is_some(),
        favorites,
        history,
    }
    .into_response()
}

async fn resolve_favorites(state: &AppState, user: &CurrentUser) -> Vec<FavoriteRow> {
    let backend = state.backend();
    let rows = backend
        .list_favorites(&user.access_token, user.id)
        .await
        .map_or_else(
            |e| {
                tracing::error!("Failed to fetch favorites: {e}");
                Vec::new()
            },
            |rows| rows,
        );

    let mut resolved = Vec::with_capacity(rows.len());
    for row in rows {
        if let Ok(Some(item)) = backend.get_item(row.item_type, &row.item_id).await {
            resolved.push(FavoriteRow {
                id: row.id,
                kind: row.item_type,
                item,
            });
        }
    }
    resolved
}

async fn resolve_history(state: &AppState, user: &CurrentUser) -> Vec<HistoryRow> {
    let backend = state.backend();
    let rows = backend
        .list_history(&user.access_token, user.id)
        .await
        .map_or_else(
            |e| {
                tracing::error!("Failed to fetch history: {e}");
                Vec::new()
            },
            |rows| rows,
        );

    let mut resolved = Vec::with_capacity(rows.len());
    for row in rows {
        if let Ok(Some(item)) = backend.get_item(row.item_type, &row.item_id).await {
            resolved.push(HistoryRow {
                id: row.id,
                kind: row.item_type,
                item,
                visited_on: row.visited_at.format("%d/%m/%Y").to_string(),
            });
        }
    }
    resolved
}

/// Handle display name update.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<UpdateProfileForm>,
) -> Response {
    let full_name = form.full_name.trim();
    if full_name.is_empty() {
        // Nothing to save; drop back to the read view
        return Redirect::to("/profile").into_response();
    }

    if let Err(e) = state
        .backend()
        .update_profile_name(&user.access_token, user.id, full_name)
        .await
    {
        tracing::error!("Profile update failed: {e}");
    }

    Redirect::to("/profile").into_response()
}

/// Remove one favorite row.
pub async fn remove_favorite(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    let favorite_id = FavoriteId::new(id);
    if let Err(e) = state
        .backend()
        .remove_favorite(&user.access_token, user.id, &favorite_id)
        .await
    {
        tracing::error!("Failed to remove favorite {favorite_id}: {e}");
    }

    Redirect::to("/profile").into_response()
}

/// Remove one history row.
pub async fn remove_history(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    let history_id = HistoryId::new(id);
    if let Err(e) = state
        .backend()
        .remove_history(&user.access_token, user.id, &history_id)
        .await
    {
        tracing::error!("Failed to remove history entry {history_id}: {e}");
    }

    Redirect::to("/profile?tab=history").into_response()
}
