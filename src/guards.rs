use tower_sessions::Session;

use crate::{
    error::AppError,
    flash,
    models::{Campground, CampgroundId, Review, ReviewId, User},
    repository::Repository,
};

// The Ownership Guard: load the targeted resource, compare its recorded
// owner/author against the caller's resolved identity, and hand the loaded
// resource back so the handler does not reload it. The load here and the
// handler's later write are not one transaction — a write that then matches
// zero rows is the caller's signal that it lost a race, and maps to NotFound.

const PERMISSION_DENIED: &str = "You do not have permission to do that";

/// require_campground_owner
///
/// Outcomes: the loaded campground on success; NotFound if the id does not
/// resolve; Forbidden (with a one-shot flash queued, redirecting back to the
/// campground page) if the caller is not the recorded owner.
pub async fn require_campground_owner(
    repo: &dyn Repository,
    session: &Session,
    user: &User,
    campground_id: CampgroundId,
) -> Result<Campground, AppError> {
    let Some(campground) = repo.get_campground(campground_id).await? else {
        return Err(AppError::NotFound("campground"));
    };

    // Value equality on the typed id, never pointer identity.
    if campground.owner_id != user.id {
        flash::push_error(session, PERMISSION_DENIED).await?;
        return Err(AppError::Forbidden {
            redirect_to: format!("/campgrounds/{campground_id}"),
        });
    }

    Ok(campground)
}

/// require_review_author
///
/// Same contract for reviews, with one extra check: a review id is only
/// meaningful under the campground named in the same path. A review that
/// exists but hangs off a different campground is NotFound here — a
/// cross-parent reference is rejected, never silently followed.
pub async fn require_review_author(
    repo: &dyn Repository,
    session: &Session,
    user: &User,
    campground_id: CampgroundId,
    review_id: ReviewId,
) -> Result<Review, AppError> {
    let Some(review) = repo.get_review(review_id).await? else {
        return Err(AppError::NotFound("review"));
    };

    if review.campground_id != campground_id {
        return Err(AppError::NotFound("review"));
    }

    if review.author_id != user.id {
        flash::push_error(session, PERMISSION_DENIED).await?;
        return Err(AppError::Forbidden {
            redirect_to: format!("/campgrounds/{campground_id}"),
        });
    }

    Ok(review)
}
