//! Catalog items: tourist destinations and foods.
//!
//! Places and foods are structurally identical rows living in two separate
//! remote tables. They share one record type here, with [`ItemKind`] selecting
//! the table and carrying the distinction through join records and routes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ItemId;

/// Discriminant between the two catalog tables.
///
/// The lowercase wire form (`"place"` / `"food"`) is what the remote
/// `favorites` and `history` tables store in their `item_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A tourist destination.
    Place,
    /// A dish or culinary item.
    Food,
}

impl ItemKind {
    /// The remote table holding rows of this kind.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Place => "places",
            Self::Food => "foods",
        }
    }

    /// The wire form stored in join-record `item_type` columns and used in
    /// URL paths (`/place/{id}`, `/food/{id}`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Place => "place",
            Self::Food => "food",
        }
    }
}

impl core::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog row: one place or one food.
///
/// Read-only from the application's perspective; the remote store owns these.
/// Latitude and longitude are both-present-or-both-absent by convention, not
/// enforced by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Opaque row identifier.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Long-form description.
    pub description: String,
    /// Category label (e.g. "Pantai", "Makanan Tradisional").
    pub category: String,
    /// Free-text location (street/area).
    pub location: String,
    /// City name.
    pub city: String,
    /// Province name.
    pub province: String,
    /// Latitude, when coordinates are known.
    pub latitude: Option<f64>,
    /// Longitude, when coordinates are known.
    pub longitude: Option<f64>,
    /// Free-text opening hours.
    pub operational_hours: String,
    /// Free-text price range (e.g. "Rp 20.000 - Rp 50.000").
    pub price_range: String,
    /// Aggregate rating.
    pub rating: f64,
    /// Primary image URL.
    pub image_url: String,
    /// Additional image URLs, in display order.
    #[serde(default)]
    pub images: Vec<String>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Coordinates as a pair, present only when both halves are set.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}
