//! User-owned records: profiles, favorites, and visit history.
//!
//! These are the rows a signed-in user can create and delete. The remote
//! store owns them; uniqueness of (user, item) pairs is not assumed here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::item::ItemKind;
use crate::types::{FavoriteId, HistoryId, ItemId, UserId};

/// User-editable metadata linked one-to-one with an identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Owning identity (same uuid as the auth subject).
    pub id: UserId,
    /// Display name.
    pub full_name: String,
    /// Email as stored on the profile row.
    pub email: String,
}

/// A row linking a user to an item they marked as a favorite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    /// Row identifier.
    pub id: FavoriteId,
    /// Owning identity.
    pub user_id: UserId,
    /// Referenced catalog row.
    pub item_id: ItemId,
    /// Which table the referenced row lives in.
    pub item_type: ItemKind,
    /// When the favorite was created.
    pub created_at: DateTime<Utc>,
}

/// A row recording that a user visited an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Row identifier.
    pub id: HistoryId,
    /// Owning identity.
    pub user_id: UserId,
    /// Referenced catalog row.
    pub item_id: ItemId,
    /// Which table the referenced row lives in.
    pub item_type: ItemKind,
    /// When the visit was recorded.
    pub visited_at: DateTime<Utc>,
}
