//! Listing page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use nusantara_core::{Item, ItemKind};

use crate::filters;
use crate::middleware::OptionalAuth;
use crate::search::{self, Tab};
use crate::state::AppState;

/// Listing page query parameters.
///
/// Both are optional so the handler also serves as the fallback for
/// unmatched paths with arbitrary query strings.
#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    /// Search text.
    pub q: Option<String>,
    /// Section filter: `all`, `places`, or `foods`.
    pub tab: Option<String>,
}

/// Listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    /// Echoed search text.
    pub query: String,
    /// Active section filter.
    pub tab: Tab,
    /// Destinations matching the query, highest rating first.
    pub places: Vec<Item>,
    /// Foods matching the query, highest rating first.
    pub foods: Vec<Item>,
    /// Whether a user is signed in.
    pub signed_in: bool,
    /// Display name for the header link, when signed in.
    pub profile_name: Option<String>,
}

/// Display the listing page.
///
/// Fetch failures are swallowed into an empty section; the page cannot tell
/// "backend down" apart from "no rows exist".
#[instrument(skip(state, user))]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(params): Query<ListingQuery>,
) -> impl IntoResponse {
    let query = params.q.unwrap_or_default();
    let tab = Tab::from_param(params.tab.as_deref());

    let places = state.backend().list_items(ItemKind::Place).await.map_or_else(
        |e| {
            tracing::error!("Failed to fetch places: {e}");
            Vec::new()
        },
        |items| items,
    );

    let foods = state.backend().list_items(ItemKind::Food).await.map_or_else(
        |e| {
            tracing::error!("Failed to fetch foods: {e}");
            Vec::new()
        },
        |items| items,
    );

    let profile_name = match &user {
        Some(current) => state
            .backend()
            .get_profile(&current.access_token, current.id)
            .await
            .ok()
            .flatten()
            .map(|profile| profile.full_name),
        None => None,
    };

    HomeTemplate {
        places: search::filter_items(places, &query),
        foods: search::filter_items(foods, &query),
        query,
        tab,
        signed_in: user.is_some(),
        profile_name,
    }
}
