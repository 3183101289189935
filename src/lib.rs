use axum::{Router, extract::FromRef, http::HeaderName, routing::get};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore, cookie::Key};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod flash;
pub mod guards;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;
pub mod validate;

// Module for routing segregation (users, campgrounds, nested reviews).
pub mod routes;
use routes::{campgrounds, reviews, users};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use config::{AppConfig, Env};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the
/// application by aggregating every handler decorated with `#[utoipa::path]`
/// and every schema decorated with `ToSchema`. Served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_campgrounds, handlers::new_campground_form, handlers::show_campground,
        handlers::create_campground, handlers::edit_campground_form, handlers::update_campground,
        handlers::delete_campground, handlers::create_review, handlers::delete_review,
        handlers::register_user, handlers::login_form, handlers::login, handlers::logout,
    ),
    components(
        schemas(
            models::UserId, models::CampgroundId, models::ReviewId,
            models::Campground, models::Image, models::Review, models::UserView,
            models::PageContext, models::CampgroundListView, models::CampgroundDetailView,
            models::CampgroundEditView, models::CredentialsForm,
            validate::FieldViolation, flash::Flash,
        )
    ),
    tags(
        (name = "camp-portal", description = "Campground listing and review API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Implements the **Unified State Pattern**: the single, thread-safe,
/// immutable container holding all application services and configuration,
/// shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: abstracts database access.
    pub repo: RepositoryState,
    /// Storage Layer: abstracts object-storage access for image uploads.
    pub storage: StorageState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These implementations allow extractors to selectively pull components from
// the shared AppState — the identity extractors resolve the repository and
// configuration through these, without depending on the whole state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's entire routing structure, applies the session
/// and observability layers, and registers the application state. The
/// session store is passed in by the caller (Postgres-backed in `main`, an
/// in-memory store in tests) so the router itself stays store-agnostic.
pub fn create_router<Store>(state: AppState, session_store: Store) -> Router
where
    Store: SessionStore + Clone,
{
    // 1. Session Layer
    // Signed opaque cookie over a server-side record; 7-day sliding expiry
    // refreshed on activity.
    let signing_key = Key::from(state.config.session_secret.as_bytes());
    let session_layer = SessionManagerLayer::new(session_store)
        .with_name("session")
        .with_signed(signing_key)
        .with_secure(state.config.env == Env::Production)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(7)));

    // 2. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 3. Base Router Assembly
    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // GET /health — unauthenticated liveness probe for monitoring and
        // load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // Identity routes (register/login/logout).
        .merge(users::user_routes())
        // Campground collection and member routes.
        .merge(campgrounds::campground_routes())
        // Review routes, nested so the parent campground's `{id}` path
        // parameter flows into the child router unchanged.
        .nest("/campgrounds/{id}/reviews", reviews::review_routes())
        // Catch-all: any unmatched path/method yields the 404 kind through
        // the centralized error responder.
        .fallback(handlers::not_found)
        // Apply the Unified State to all routes.
        .with_state(state);

    // 4. Session, Observability, and Correlation Layers
    base_router
        .layer(session_layer)
        .layer(
            ServiceBuilder::new()
                // 4a. Request ID Generation: a unique UUID for every request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 4b. Request Tracing: wraps the request/response lifecycle in
                // a span correlated by the generated request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 4c. Request ID Propagation: return the x-request-id header
                // to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 5. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Helper used by `TraceLayer` to customize span creation: extracts the
/// `x-request-id` header (if present) and includes it in the structured
/// logging metadata alongside the HTTP method and URI, so every log line for
/// a single request is correlated by a unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
