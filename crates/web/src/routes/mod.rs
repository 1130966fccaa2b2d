//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Listing page (?q= search, ?tab= filter)
//! GET  /health                 - Health check (added in main)
//!
//! # Catalog
//! GET  /place/{id}             - Destination detail
//! GET  /food/{id}              - Food detail
//! POST /place/{id}/favorite    - Toggle favorite (auth required)
//! POST /food/{id}/favorite     - Toggle favorite (auth required)
//! POST /place/{id}/visit       - Record a visit (auth required)
//! POST /food/{id}/visit        - Record a visit (auth required)
//!
//! # Auth
//! GET  /auth                   - Sign-in / sign-up page (?mode=register)
//! POST /auth/login             - Sign-in action
//! POST /auth/register          - Sign-up action
//! POST /auth/logout            - Sign-out action
//!
//! # Profile (requires auth)
//! GET  /profile                - Profile page (?tab=history, ?edit=1)
//! POST /profile                - Update display name
//! POST /profile/favorites/{id}/remove - Remove a favorite
//! POST /profile/history/{id}/remove   - Remove a history entry
//! ```
//!
//! Any unmatched path falls back to the listing page; there is no distinct
//! 404 page.

pub mod auth;
pub mod detail;
pub mod home;
pub mod profile;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(auth::auth_page))
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the destination routes router.
pub fn place_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(detail::show_place))
        .route("/{id}/favorite", post(detail::toggle_place_favorite))
        .route("/{id}/visit", post(detail::visit_place))
}

/// Create the food routes router.
pub fn food_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(detail::show_food))
        .route("/{id}/favorite", post(detail::toggle_food_favorite))
        .route("/{id}/visit", post(detail::visit_food))
}

/// Create the profile routes router.
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(profile::index).post(profile::update))
        .route("/favorites/{id}/remove", post(profile::remove_favorite))
        .route("/history/{id}/remove", post(profile::remove_history))
}

/// Create all routes for the site.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Listing page
        .route("/", get(home::home))
        // Catalog detail + commands
        .nest("/place", place_routes())
        .nest("/food", food_routes())
        // Auth
        .nest("/auth", auth_routes())
        // Profile
        .nest("/profile", profile_routes())
        // Unmatched paths render the listing page
        .fallback(home::home)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::Json;
    use axum::body::Body;
    use axum::extract::State as StubState;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use secrecy::SecretString;
    use serde_json::json;
    use tower::ServiceExt;
    use url::Url;

    use crate::config::{AppConfig, SupabaseConfig};
    use crate::middleware::create_session_layer;
    use crate::state::AppState;

    /// App wired to an arbitrary backend URL. The session store is shared
    /// across clones, so a cookie from one request works on the next.
    fn test_app_with_backend(backend_url: &str) -> axum::Router {
        let config = AppConfig {
            host: "127.0.0.1".parse().expect("host"),
            port: 0,
            base_url: "http://localhost:3000".to_owned(),
            supabase: SupabaseConfig {
                url: Url::parse(backend_url).expect("url"),
                anon_key: SecretString::from("test-anon-key"),
            },
            sentry_dsn: None,
            sentry_environment: None,
        };
        let state = AppState::new(config).expect("state");
        let session_layer = create_session_layer(state.config());

        super::routes().layer(session_layer).with_state(state)
    }

    /// App wired to an unreachable backend: every fetch fails fast, which
    /// exercises the swallow-to-empty paths without a network.
    fn test_app() -> axum::Router {
        test_app_with_backend("http://127.0.0.1:9/")
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    fn location(response: &axum::response::Response) -> Option<&str> {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    // =========================================================================
    // Stub backend
    // =========================================================================

    /// In-process stand-in for the remote table + identity APIs, recording
    /// the writes it receives.
    #[derive(Clone, Default)]
    struct StubBackend {
        favorites: Arc<Mutex<Vec<serde_json::Value>>>,
        inserts: Arc<AtomicUsize>,
        deletes: Arc<AtomicUsize>,
    }

    async fn stub_token() -> Json<serde_json::Value> {
        Json(json!({
            "access_token": "stub-token",
            "token_type": "bearer",
            "user": {
                "id": "00000000-0000-0000-0000-000000000001",
                "email": "budi@example.id"
            }
        }))
    }

    async fn stub_list_favorites(
        StubState(stub): StubState<StubBackend>,
    ) -> Json<serde_json::Value> {
        let rows = stub.favorites.lock().expect("stub lock").clone();
        Json(serde_json::Value::Array(rows))
    }

    async fn stub_insert_favorite(
        StubState(stub): StubState<StubBackend>,
        Json(mut row): Json<serde_json::Value>,
    ) -> StatusCode {
        stub.inserts.fetch_add(1, Ordering::SeqCst);
        row["id"] = json!("fav-1");
        row["created_at"] = json!("2024-01-01T00:00:00Z");
        stub.favorites.lock().expect("stub lock").push(row);
        StatusCode::CREATED
    }

    async fn stub_delete_favorites(StubState(stub): StubState<StubBackend>) -> StatusCode {
        stub.deletes.fetch_add(1, Ordering::SeqCst);
        stub.favorites.lock().expect("stub lock").clear();
        StatusCode::NO_CONTENT
    }

    async fn spawn_stub() -> (StubBackend, SocketAddr) {
        let stub = StubBackend::default();
        let router = axum::Router::new()
            .route("/auth/v1/token", axum::routing::post(stub_token))
            .route(
                "/rest/v1/favorites",
                axum::routing::get(stub_list_favorites)
                    .post(stub_insert_favorite)
                    .delete(stub_delete_favorites),
            )
            .with_state(stub.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve stub");
        });
        (stub, addr)
    }

    /// Identity API works, but every table call answers 401 as it does once
    /// the issued token has expired.
    async fn spawn_expired_token_stub() -> SocketAddr {
        let router = axum::Router::new()
            .route("/auth/v1/token", axum::routing::post(stub_token))
            .fallback(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"message": "JWT expired"})),
                )
            });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve stub");
        });
        addr
    }

    /// Sign in through the real login flow and return the session cookie.
    async fn sign_in(app: &axum::Router) -> String {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("email=budi%40example.id&password=rahasia123"))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/profile"));

        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .expect("session cookie")
            .to_owned()
    }

    #[tokio::test]
    async fn unmatched_path_renders_listing_page() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/definitely/not/a/route")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Wonderful Indonesia"));
    }

    #[tokio::test]
    async fn detail_paths_route_by_kind() {
        // The backend is unreachable, so both resolve to the kind-specific
        // not-found state rather than the listing fallback.
        let app = test_app();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/place/abc123")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Place not found"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/food/xyz")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Food not found"));
    }

    #[tokio::test]
    async fn profile_redirects_to_auth_when_signed_out() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/profile")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some("/auth")
        );
    }

    #[tokio::test]
    async fn favorite_toggle_redirects_to_auth_when_signed_out() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/place/abc123/favorite")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some("/auth")
        );
    }

    #[tokio::test]
    async fn auth_page_renders_both_modes() {
        let app = test_app();
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/auth").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Masuk"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth?mode=register")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Daftar"));
    }

    #[tokio::test]
    async fn toggling_favorite_twice_restores_the_original_state() {
        let (stub, addr) = spawn_stub().await;
        let app = test_app_with_backend(&format!("http://{addr}/"));
        let cookie = sign_in(&app).await;

        // First toggle: no favorite row exists yet, so one is inserted
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/place/p1/favorite")
                    .header(header::COOKIE, cookie.clone())
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/place/p1"));
        assert_eq!(stub.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(stub.deletes.load(Ordering::SeqCst), 0);

        // Second toggle: the row is found and deleted
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/place/p1/favorite")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/place/p1"));
        assert_eq!(stub.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(stub.deletes.load(Ordering::SeqCst), 1);
        assert!(stub.favorites.lock().expect("stub lock").is_empty());
    }

    #[tokio::test]
    async fn expired_backend_token_ends_the_session() {
        let addr = spawn_expired_token_stub().await;
        let app = test_app_with_backend(&format!("http://{addr}/"));
        let cookie = sign_in(&app).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/profile")
                    .header(header::COOKIE, cookie.clone())
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/auth"));

        // The session was flushed; the old cookie no longer signs anyone in
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/profile")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/auth"));
    }

    #[tokio::test]
    async fn blank_full_name_is_rejected_before_any_remote_call() {
        // The backend is unreachable in tests; a local rejection is the only
        // way this redirect can be produced.
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/register")
                    .header(
                        header::CONTENT_TYPE,
                        "application/x-www-form-urlencoded",
                    )
                    .body(Body::from(
                        "full_name=&email=user%40example.com&password=rahasia123",
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some("/auth?mode=register&error=name_required")
        );
    }

    #[tokio::test]
    async fn short_password_is_rejected_before_any_remote_call() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/register")
                    .header(
                        header::CONTENT_TYPE,
                        "application/x-www-form-urlencoded",
                    )
                    .body(Body::from(
                        "full_name=Budi&email=user%40example.com&password=abc",
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some("/auth?mode=register&error=password_too_short")
        );
    }
}
