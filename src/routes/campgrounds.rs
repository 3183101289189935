use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Campground Router Module
///
/// Collection and member routes for campground listings. Reads are public;
/// the mutating routes and the form contexts require authentication (and,
/// for member mutations, ownership), enforced inside each handler by the
/// `AuthUser` extractor and the Ownership Guard.
pub fn campground_routes() -> Router<AppState> {
    Router::new()
        // GET /campgrounds — public listing, newest first.
        // POST /campgrounds — authenticated multipart submission (fields +
        // 0..N image files).
        .route(
            "/campgrounds",
            get(handlers::list_campgrounds).post(handlers::create_campground),
        )
        // GET /campgrounds/new — form context. The static segment takes
        // precedence over the `{id}` matcher, so "new" is never read as an id.
        .route("/campgrounds/new", get(handlers::new_campground_form))
        // GET /campgrounds/{id} — public detail with images and reviews.
        // PUT /campgrounds/{id} — owner-only multipart update.
        // DELETE /campgrounds/{id} — owner-only; reviews cascade, stored
        // objects are cleaned up best-effort.
        .route(
            "/campgrounds/{id}",
            get(handlers::show_campground)
                .put(handlers::update_campground)
                .delete(handlers::delete_campground),
        )
        // GET /campgrounds/{id}/edit — owner-only edit form context.
        .route("/campgrounds/{id}/edit", get(handlers::edit_campground_form))
}
