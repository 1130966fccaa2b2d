//! Nusantara - Tourism and food discovery for Indonesia.
//!
//! This binary serves the public site on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework with server-side rendering
//! - Askama templates
//! - Remote backend-as-a-service for all persistence: a PostgREST-style
//!   table API (`places`, `foods`, `favorites`, `history`, `profiles`) and
//!   a GoTrue-style identity API
//! - In-memory server-side sessions (no local database anywhere)
//!
//! There is no local state to migrate or back up; the process can be
//! restarted freely at the cost of signing users out.

#![cfg_attr(not(test), forbid(unsafe_code))]
// The module tree is shared with the library target; some surfaces are only
// reached through the library.
#![allow(dead_code)]

use axum::http::StatusCode;
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

mod config;
mod error;
mod filters;
mod middleware;
mod models;
mod routes;
mod search;
mod state;
mod supabase;

use config::AppConfig;
use sentry::integrations::tracing as sentry_tracing;
use state::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AppConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Initialize tracing with EnvFilter and Sentry integration
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "nusantara_web=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // Build application state (constructs the backend gateway)
    let state = AppState::new(config.clone()).expect("Failed to initialize application state");

    // Create session layer (in-memory; sessions do not survive restart)
    let session_layer = middleware::create_session_layer(state.config());

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    // Start server
    let addr = config.socket_addr();
    tracing::info!("nusantara listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the remote backend is reachable before returning OK. A failed
/// catalog read propagates as a backend error (502 Bad Gateway).
async fn readiness(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> error::Result<StatusCode> {
    state
        .backend()
        .list_items(nusantara_core::ItemKind::Place)
        .await?;
    Ok(StatusCode::OK)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use axum::extract::State;
    use axum::response::IntoResponse;
    use secrecy::SecretString;
    use url::Url;

    use super::*;
    use crate::config::SupabaseConfig;

    #[tokio::test]
    async fn readiness_maps_backend_failure_to_bad_gateway() {
        let config = AppConfig {
            host: "127.0.0.1".parse().expect("host"),
            port: 0,
            base_url: "http://localhost:3000".to_owned(),
            supabase: SupabaseConfig {
                url: Url::parse("http://127.0.0.1:9/").expect("url"),
                anon_key: SecretString::from("test-anon-key"),
            },
            sentry_dsn: None,
            sentry_environment: None,
        };
        let state = AppState::new(config).expect("state");

        let response = match readiness(State(state)).await {
            Ok(status) => status.into_response(),
            Err(err) => err.into_response(),
        };
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
