use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// User Router Module
///
/// The identity flow: registration (which signs the new account in), the
/// login entry point that turned-away requests are redirected to, and
/// logout. All public — credential verification itself is the gate.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        // POST /register — create an identity and establish a session.
        .route("/register", post(handlers::register_user))
        // GET /login — entry-point context (this is where the one-shot
        // "You must be signed in first" flash is drained).
        // POST /login — verify credentials; failure is generic.
        .route(
            "/login",
            get(handlers::login_form).post(handlers::login),
        )
        // POST /logout — drop the session identity.
        .route("/logout", post(handlers::logout))
}
