//! Detail page route handlers and the favorite/visit commands.
//!
//! The captured path segment is passed to the backend verbatim as an opaque
//! identifier - no decoding, no validation. A missing row and a failed fetch
//! both render the not-found state.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use nusantara_core::{Item, ItemId, ItemKind};

use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "detail.html")]
pub struct DetailTemplate {
    /// The item being shown.
    pub item: Item,
    /// Which table it came from.
    pub kind: ItemKind,
    /// Whether the signed-in user has favorited it.
    pub favorited: bool,
    /// Whether a user is signed in.
    pub signed_in: bool,
    /// Outbound maps link, when both coordinates are present.
    pub maps_url: Option<String>,
}

/// Not-found state template.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    /// Which kind of item was requested.
    pub kind: ItemKind,
}

/// Display a destination detail page.
pub async fn show_place(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<String>,
) -> Response {
    show(state, user, ItemKind::Place, id).await
}

/// Display a food detail page.
pub async fn show_food(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<String>,
) -> Response {
    show(state, user, ItemKind::Food, id).await
}

#[instrument(skip(state, user), fields(kind = %kind, id = %id))]
async fn show(state: AppState, user: Option<CurrentUser>, kind: ItemKind, id: String) -> Response {
    let item_id = ItemId::new(id);

    let item = match state.backend().get_item(kind, &item_id).await {
        Ok(Some(item)) => item,
        Ok(None) => return NotFoundTemplate { kind }.into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch {kind} {item_id}: {e}");
            return NotFoundTemplate { kind }.into_response();
        }
    };

    // Existence check on mount, only when signed in
    let favorited = match &user {
        Some(current) => state
            .backend()
            .find_favorite(&current.access_token, current.id, kind, &item_id)
            .await
            .ok()
            .flatten()
            .is_some(),
        None => false,
    };

    let maps_url = item.coordinates().map(|(lat, lng)| {
        format!("https://www.google.com/maps/search/?api=1&query={lat},{lng}")
    });

    DetailTemplate {
        item,
        kind,
        favorited,
        signed_in: user.is_some(),
        maps_url,
    }
    .into_response()
}

// =============================================================================
// Commands
// =============================================================================

/// Toggle the favorite on a destination, then return to its page.
pub async fn toggle_place_favorite(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    toggle_favorite(state, user, ItemKind::Place, id).await
}

/// Toggle the favorite on a food, then return to its page.
pub async fn toggle_food_favorite(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    toggle_favorite(state, user, ItemKind::Food, id).await
}

/// Check-then-insert/delete, executed server-side within one request.
///
/// Two rapid toggles still race at the backend (no idempotency key there),
/// but each request is internally ordered.
#[instrument(skip(state, user), fields(kind = %kind, id = %id))]
async fn toggle_favorite(
    state: AppState,
    user: CurrentUser,
    kind: ItemKind,
    id: String,
) -> Response {
    let item_id = ItemId::new(&id);
    let backend = state.backend();

    let result = match backend
        .find_favorite(&user.access_token, user.id, kind, &item_id)
        .await
    {
        Ok(Some(_)) => {
            backend
                .clear_favorite(&user.access_token, user.id, kind, &item_id)
                .await
        }
        Ok(None) => {
            backend
                .add_favorite(&user.access_token, user.id, kind, &item_id)
                .await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::error!("Favorite toggle failed for {kind} {item_id}: {e}");
    }

    Redirect::to(&format!("/{kind}/{id}")).into_response()
}

/// Record a visit to a destination, then return to its page.
pub async fn visit_place(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    record_visit(state, user, ItemKind::Place, id).await
}

/// Record a visit to a food, then return to its page.
pub async fn visit_food(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Response {
    record_visit(state, user, ItemKind::Food, id).await
}

#[instrument(skip(state, user), fields(kind = %kind, id = %id))]
async fn record_visit(state: AppState, user: CurrentUser, kind: ItemKind, id: String) -> Response {
    let item_id = ItemId::new(&id);

    if let Err(e) = state
        .backend()
        .add_visit(&user.access_token, user.id, kind, &item_id)
        .await
    {
        tracing::error!("Recording visit failed for {kind} {item_id}: {e}");
    }

    Redirect::to(&format!("/{kind}/{id}")).into_response()
}
