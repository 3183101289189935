use axum::{
    Json,
    extract::{Form, Multipart, Path, State},
    response::Redirect,
};
use chrono::Utc;
use std::collections::HashMap;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{self, AuthUser, CurrentUser, SESSION_RETURN_TO_KEY, SESSION_USER_KEY},
    error::AppError,
    flash,
    guards,
    models::{
        CampgroundDetailView, CampgroundEditView, CampgroundId, CampgroundInput,
        CampgroundListView, CredentialsForm, PageContext, ReviewId, ReviewInput, User, UserId,
        UserView,
    },
    storage::{self, UploadPart},
    validate::{CAMPGROUND_SCHEMA, CREDENTIALS_SCHEMA, FieldValue, REVIEW_SCHEMA, validate},
};

// --- Campground Handlers ---

/// list_campgrounds
///
/// [Public Route] Lists all campgrounds, newest first. The response carries
/// the resolved identity and drains the one-shot flash, which is everything
/// the listing page renders from.
#[utoipa::path(
    get,
    path = "/campgrounds",
    responses((status = 200, description = "Campground listing", body = CampgroundListView))
)]
pub async fn list_campgrounds(
    CurrentUser(current): CurrentUser,
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CampgroundListView>, AppError> {
    let campgrounds = state.repo.list_campgrounds().await?;
    let flash = flash::take(&session).await?;
    Ok(Json(CampgroundListView {
        current_user: current.as_ref().map(UserView::from),
        flash,
        campgrounds,
    }))
}

/// new_campground_form
///
/// [Authenticated Route] The new-campground form context. Anonymous callers
/// are redirected to the login entry point by the `AuthUser` extractor, with
/// this destination saved for post-login continuation.
#[utoipa::path(
    get,
    path = "/campgrounds/new",
    responses(
        (status = 200, description = "Form context", body = PageContext),
        (status = 303, description = "Not signed in, redirects to /login")
    )
)]
pub async fn new_campground_form(
    AuthUser(user): AuthUser,
    session: Session,
) -> Result<Json<PageContext>, AppError> {
    let flash = flash::take(&session).await?;
    Ok(Json(PageContext {
        current_user: Some(UserView::from(&user)),
        flash,
    }))
}

/// show_campground
///
/// [Public Route] A single campground with its ordered images and reviews.
#[utoipa::path(
    get,
    path = "/campgrounds/{id}",
    params(("id" = Uuid, Path, description = "Campground ID")),
    responses(
        (status = 200, description = "Campground detail", body = CampgroundDetailView),
        (status = 404, description = "Not Found")
    )
)]
pub async fn show_campground(
    CurrentUser(current): CurrentUser,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<CampgroundId>,
) -> Result<Json<CampgroundDetailView>, AppError> {
    let Some(campground) = state.repo.get_campground(id).await? else {
        return Err(AppError::NotFound("campground"));
    };
    let images = state.repo.get_campground_images(id).await?;
    let reviews = state.repo.list_reviews(id).await?;
    let flash = flash::take(&session).await?;
    Ok(Json(CampgroundDetailView {
        current_user: current.as_ref().map(UserView::from),
        flash,
        campground,
        images,
        reviews,
    }))
}

/// create_campground
///
/// [Authenticated Route] Creates a campground from a multipart submission.
///
/// Pipeline order: identity (extractor) → parse → validate → upload →
/// persist. Validation runs before any upload, so a rejected payload never
/// stores an object; if persistence fails after the uploads succeeded, the
/// uploaded objects are deleted again (compensating cleanup).
#[utoipa::path(
    post,
    path = "/campgrounds",
    responses(
        (status = 303, description = "Created, redirects to the new campground"),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_campground(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    let (fields, files) = read_campground_form(multipart).await?;
    let values = validate(&CAMPGROUND_SCHEMA, &fields).map_err(AppError::ValidationFailed)?;
    let input = CampgroundInput::from_validated(&values);

    let images = storage::store_images(state.storage.as_ref(), files).await?;

    let campground = match state
        .repo
        .create_campground(input, user.id, images.clone())
        .await
    {
        Ok(campground) => campground,
        Err(err) => {
            // The uploads landed but the row did not; take the objects back.
            storage::discard_images(state.storage.as_ref(), &images).await;
            return Err(err.into());
        }
    };

    flash::push_success(&session, "Successfully made a new campground").await?;
    Ok(Redirect::to(&format!("/campgrounds/{}", campground.id)))
}

/// edit_campground_form
///
/// [Owner Route] The edit-form context for a campground. The Ownership Guard
/// loads the campground once and passes it through, so this handler performs
/// no second lookup.
#[utoipa::path(
    get,
    path = "/campgrounds/{id}/edit",
    params(("id" = Uuid, Path, description = "Campground ID")),
    responses(
        (status = 200, description = "Edit form context", body = CampgroundEditView),
        (status = 303, description = "Not the owner, redirects with flash"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn edit_campground_form(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<CampgroundId>,
) -> Result<Json<CampgroundEditView>, AppError> {
    let campground =
        guards::require_campground_owner(state.repo.as_ref(), &session, &user, id).await?;
    let images = state.repo.get_campground_images(id).await?;
    let flash = flash::take(&session).await?;
    Ok(Json(CampgroundEditView {
        current_user: Some(UserView::from(&user)),
        flash,
        campground,
        images,
    }))
}

/// update_campground
///
/// [Owner Route] Applies a full replacement of the campground's fields and
/// appends any newly submitted images. A zero-row update after the guard
/// passed means a concurrent delete won the race; that is a recoverable
/// NotFound, and the freshly uploaded objects are cleaned up.
#[utoipa::path(
    put,
    path = "/campgrounds/{id}",
    params(("id" = Uuid, Path, description = "Campground ID")),
    responses(
        (status = 303, description = "Updated, redirects to the campground"),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_campground(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<CampgroundId>,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    guards::require_campground_owner(state.repo.as_ref(), &session, &user, id).await?;

    let (fields, files) = read_campground_form(multipart).await?;
    let values = validate(&CAMPGROUND_SCHEMA, &fields).map_err(AppError::ValidationFailed)?;
    let input = CampgroundInput::from_validated(&values);

    let images = storage::store_images(state.storage.as_ref(), files).await?;

    match state.repo.update_campground(id, input, images.clone()).await {
        Ok(Some(campground)) => {
            flash::push_success(&session, "Successfully updated campground").await?;
            Ok(Redirect::to(&format!("/campgrounds/{}", campground.id)))
        }
        Ok(None) => {
            storage::discard_images(state.storage.as_ref(), &images).await;
            Err(AppError::NotFound("campground"))
        }
        Err(err) => {
            storage::discard_images(state.storage.as_ref(), &images).await;
            Err(err.into())
        }
    }
}

/// delete_campground
///
/// [Owner Route] Deletes a campground. Its reviews cascade with it, and its
/// stored image objects are deleted best-effort afterwards. A delete that
/// matches zero rows (already gone) is NotFound, not a crash.
#[utoipa::path(
    delete,
    path = "/campgrounds/{id}",
    params(("id" = Uuid, Path, description = "Campground ID")),
    responses(
        (status = 303, description = "Deleted, redirects to the listing"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_campground(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<CampgroundId>,
) -> Result<Redirect, AppError> {
    guards::require_campground_owner(state.repo.as_ref(), &session, &user, id).await?;

    // Capture the locators before the rows cascade away.
    let images = state.repo.get_campground_images(id).await?;

    if !state.repo.delete_campground(id).await? {
        return Err(AppError::NotFound("campground"));
    }

    storage::discard_images(state.storage.as_ref(), &images).await;

    flash::push_success(&session, "Successfully deleted campground").await?;
    Ok(Redirect::to("/campgrounds"))
}

// --- Review Handlers ---

/// create_review
///
/// [Authenticated Route] Posts a review under the campground named in the
/// path. The parent must resolve before anything persists; the repository
/// re-checks at insert time, so a parent deleted mid-request surfaces as
/// NotFound rather than an orphaned review.
#[utoipa::path(
    post,
    path = "/campgrounds/{id}/reviews",
    params(("id" = Uuid, Path, description = "Campground ID")),
    responses(
        (status = 303, description = "Created, redirects to the campground"),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Campground not found")
    )
)]
pub async fn create_review(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    session: Session,
    Path(campground_id): Path<CampgroundId>,
    Form(raw): Form<HashMap<String, String>>,
) -> Result<Redirect, AppError> {
    if state.repo.get_campground(campground_id).await?.is_none() {
        return Err(AppError::NotFound("campground"));
    }

    let values = validate(&REVIEW_SCHEMA, &raw).map_err(AppError::ValidationFailed)?;
    let input = ReviewInput::from_validated(&values);

    match state.repo.create_review(campground_id, user.id, input).await? {
        Some(_) => {
            flash::push_success(&session, "Created new review").await?;
            Ok(Redirect::to(&format!("/campgrounds/{campground_id}")))
        }
        // Parent vanished between the check above and the insert.
        None => Err(AppError::NotFound("campground")),
    }
}

/// delete_review
///
/// [Author Route] Deletes a review. The guard resolves the review id inside
/// the path-declared campground's identity space and enforces that only the
/// author — not even the campground's owner — may delete it.
#[utoipa::path(
    delete,
    path = "/campgrounds/{id}/reviews/{review_id}",
    params(
        ("id" = Uuid, Path, description = "Campground ID"),
        ("review_id" = Uuid, Path, description = "Review ID")
    ),
    responses(
        (status = 303, description = "Deleted, redirects to the campground"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_review(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    session: Session,
    Path((campground_id, review_id)): Path<(CampgroundId, ReviewId)>,
) -> Result<Redirect, AppError> {
    guards::require_review_author(state.repo.as_ref(), &session, &user, campground_id, review_id)
        .await?;

    if !state.repo.delete_review(review_id).await? {
        return Err(AppError::NotFound("review"));
    }

    flash::push_success(&session, "Successfully deleted review").await?;
    Ok(Redirect::to(&format!("/campgrounds/{campground_id}")))
}

// --- User Handlers ---

/// register_user
///
/// [Public Route] Creates an identity and signs the new user in. The
/// submitted secret is stored only as its Argon2 derivation; a taken
/// username surfaces as a field violation.
#[utoipa::path(
    post,
    path = "/register",
    responses(
        (status = 303, description = "Registered and signed in"),
        (status = 400, description = "Validation failed or username taken")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    session: Session,
    Form(raw): Form<HashMap<String, String>>,
) -> Result<Redirect, AppError> {
    let values = validate(&CREDENTIALS_SCHEMA, &raw).map_err(AppError::ValidationFailed)?;
    let username = values
        .get("username")
        .and_then(FieldValue::as_text)
        .unwrap_or_default();
    let password = values
        .get("password")
        .and_then(FieldValue::as_text)
        .unwrap_or_default();

    let user = User {
        id: UserId::new(),
        username,
        password_hash: auth::hash_password(&password)?,
        created_at: Utc::now(),
    };
    let created = state.repo.create_user(user).await?;

    // Sign the new account in under a fresh session id.
    session.cycle_id().await?;
    session.insert(SESSION_USER_KEY, created.id).await?;
    flash::push_success(&session, "Welcome to Camp Portal").await?;
    Ok(Redirect::to("/campgrounds"))
}

/// login_form
///
/// [Public Route] The login page context: identity (normally anonymous) and
/// the drained flash — which is where the "You must be signed in first"
/// message from a rejected request shows up, exactly once.
#[utoipa::path(
    get,
    path = "/login",
    responses((status = 200, description = "Login form context", body = PageContext))
)]
pub async fn login_form(
    CurrentUser(current): CurrentUser,
    session: Session,
) -> Result<Json<PageContext>, AppError> {
    let flash = flash::take(&session).await?;
    Ok(Json(PageContext {
        current_user: current.as_ref().map(UserView::from),
        flash,
    }))
}

/// login
///
/// [Public Route] Verifies credentials and establishes the session.
///
/// The failure response is identical for an unknown username and a wrong
/// password, and an unknown username still pays for one hash derivation so
/// the two paths cost the same. On success the session id is cycled and the
/// caller continues to the destination saved when they were turned away,
/// falling back to the listing.
#[utoipa::path(
    post,
    path = "/login",
    request_body = CredentialsForm,
    responses(
        (status = 303, description = "Signed in and continuing to the saved destination, \
                                      or bounced back to /login on invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<Redirect, AppError> {
    match state.repo.find_user_by_username(&form.username).await? {
        Some(user) if auth::verify_password(&user.password_hash, &form.password) => {
            session.cycle_id().await?;
            session.insert(SESSION_USER_KEY, user.id).await?;

            let destination = session
                .remove::<String>(SESSION_RETURN_TO_KEY)
                .await?
                .unwrap_or_else(|| "/campgrounds".to_string());
            flash::push_success(&session, "Welcome back").await?;
            Ok(Redirect::to(&destination))
        }
        other => {
            if other.is_none() {
                // Unknown user: burn a derivation anyway.
                auth::hash_password(&form.password).ok();
            }
            flash::push_error(&session, "Invalid username or password").await?;
            Err(AppError::NotAuthenticated {
                redirect_to: "/login".to_string(),
            })
        }
    }
}

/// logout
///
/// [Public Route] Drops the session's identity. Safe to call anonymously.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 303, description = "Signed out, redirects to the listing"))
)]
pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    session.remove::<UserId>(SESSION_USER_KEY).await?;
    session.remove::<String>(SESSION_RETURN_TO_KEY).await?;
    flash::push_success(&session, "Goodbye").await?;
    Ok(Redirect::to("/campgrounds"))
}

// --- Fallback ---

/// not_found
///
/// Catch-all for any path/method not otherwise routed. Yields the 404 kind
/// through the centralized responder, so every request produces exactly one
/// terminal response.
pub async fn not_found() -> AppError {
    AppError::NotFound("page")
}

// --- Multipart Parsing ---

/// Splits a campground multipart submission into its text fields and file
/// parts. Any part carrying a filename is treated as an image upload; a
/// nameless file part (a browser submitting an empty file input) is skipped.
/// A malformed body is a 400-class payload violation, not a server error.
async fn read_campground_form(
    mut multipart: Multipart,
) -> Result<(HashMap<String, String>, Vec<UploadPart>), AppError> {
    let mut fields = HashMap::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::violation("payload", "malformed multipart body"))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(filename) = field.file_name().map(ToString::to_string) {
            if filename.is_empty() {
                continue;
            }
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|_| AppError::violation("payload", "malformed multipart body"))?
                .to_vec();
            files.push(UploadPart {
                filename,
                content_type,
                data,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|_| AppError::violation("payload", "malformed multipart body"))?;
            fields.insert(name, value);
        }
    }

    Ok((fields, files))
}
