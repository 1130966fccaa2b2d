//! Session-facing models for the web binary.

pub mod session;

pub use session::{CurrentUser, session_keys};
