//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::supabase::{BackendError, Supabase};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configuration and the remote backend gateway.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    backend: Supabase,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be constructed.
    pub fn new(config: AppConfig) -> Result<Self, BackendError> {
        let backend = Supabase::new(&config.supabase)?;

        Ok(Self {
            inner: Arc::new(AppStateInner { config, backend }),
        })
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the remote backend gateway.
    #[must_use]
    pub fn backend(&self) -> &Supabase {
        &self.inner.backend
    }
}
