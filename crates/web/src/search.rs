//! Listing search and tab filtering.
//!
//! Search is a case-insensitive substring match over rows already fetched
//! from the backend - no server-side query, no index. A query matches an
//! item when it occurs in the name, the free-text location, or the city.

use nusantara_core::Item;

/// Which sections of the listing page to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    /// Both destinations and foods.
    #[default]
    All,
    /// Destinations only.
    Places,
    /// Foods only.
    Foods,
}

impl Tab {
    /// Parse the `tab` query parameter, defaulting to [`Tab::All`].
    ///
    /// Unknown values fall back to the default rather than failing the
    /// request.
    #[must_use]
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("places") => Self::Places,
            Some("foods") => Self::Foods,
            _ => Self::All,
        }
    }

    /// Whether the places section is visible under this tab.
    #[must_use]
    pub const fn shows_places(self) -> bool {
        matches!(self, Self::All | Self::Places)
    }

    /// Whether the foods section is visible under this tab.
    #[must_use]
    pub const fn shows_foods(self) -> bool {
        matches!(self, Self::All | Self::Foods)
    }

    /// URL query value for this tab.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Places => "places",
            Self::Foods => "foods",
        }
    }
}

/// Whether an item matches a search query.
///
/// Empty queries match everything. Matching is case-insensitive over the
/// name, location, and city fields.
#[must_use]
pub fn matches_query(item: &Item, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    item.name.to_lowercase().contains(&needle)
        || item.location.to_lowercase().contains(&needle)
        || item.city.to_lowercase().contains(&needle)
}

/// Keep only the items matching the query, preserving order.
#[must_use]
pub fn filter_items(items: Vec<Item>, query: &str) -> Vec<Item> {
    items
        .into_iter()
        .filter(|item| matches_query(item, query))
        .collect()
}
