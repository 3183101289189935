use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, post},
};

/// Review Router Module
///
/// Mounted via `nest("/campgrounds/{id}/reviews", ...)`, so every route here
/// inherits the parent campground's `{id}` path parameter unchanged. A review
/// id only resolves inside that parent's identity space: the delete guard
/// rejects a review that exists under a different campground.
pub fn review_routes() -> Router<AppState> {
    Router::new()
        // POST /campgrounds/{id}/reviews — authenticated; the parent must
        // exist at creation time.
        .route("/", post(handlers::create_review))
        // DELETE /campgrounds/{id}/reviews/{review_id} — author-only.
        .route("/{review_id}", delete(handlers::delete_review))
}
