//! Nusantara Core - Shared types library.
//!
//! This crate provides the domain types used by the Nusantara web binary:
//! catalog items (places and foods), user profiles, and the favorite/history
//! join records.
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. All rows are
//! owned by the remote backend; these types are the transient, possibly-stale
//! copies the application works with.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and emails
//! - [`item`] - Catalog items and the place/food discriminant
//! - [`activity`] - Profiles, favorites, and visit history

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod activity;
pub mod item;
pub mod types;

pub use activity::{Favorite, HistoryEntry, Profile};
pub use item::{Item, ItemKind};
pub use types::*;
