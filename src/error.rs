use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::validate::FieldViolation;

/// AppError
///
/// The application-wide error taxonomy. Every fallible handler returns
/// `Result<_, AppError>`, so a rejected operation anywhere in the pipeline
/// (identity resolution, ownership guard, validation, storage, persistence)
/// is forwarded to the single centralized responder below instead of being
/// lost or crashing the process.
#[derive(Debug, Error)]
pub enum AppError {
    /// No resolved identity on a route that requires one. The rejecting
    /// extractor has already queued a flash and saved the requested
    /// destination; this just carries the redirect target.
    #[error("authentication required")]
    NotAuthenticated { redirect_to: String },

    /// Authenticated, but not the owner/author of the targeted resource.
    /// Carries the same redirect-with-flash shape as NotAuthenticated so the
    /// response reveals nothing beyond what NotFound already would.
    #[error("permission denied")]
    Forbidden { redirect_to: String },

    /// The targeted resource id does not resolve (or a write raced a delete).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The submitted payload violates its schema. Nothing was persisted.
    #[error("validation failed")]
    ValidationFailed(Vec<FieldViolation>),

    /// An external dependency (database, object storage, session store)
    /// failed. Logged in full; the client sees a generic message.
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl AppError {
    pub fn upstream(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Upstream(format!("{context}: {err}"))
    }

    pub fn violation(field: &str, message: &str) -> Self {
        Self::ValidationFailed(vec![FieldViolation::new(field, message)])
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::upstream("session store", err)
    }
}

/// Centralized error responder.
///
/// Maps each error kind to a terminal response: 303 redirects for the
/// auth-flow kinds (the flash message was queued by whoever produced the
/// error), JSON bodies for the rest. Unknown internals default to
/// 500/"Something went wrong" and never leak details to the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::NotAuthenticated { redirect_to } | Self::Forbidden { redirect_to } => {
                Redirect::to(&redirect_to).into_response()
            }
            Self::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("{what} not found") })),
            )
                .into_response(),
            Self::ValidationFailed(violations) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "validation failed", "violations": violations })),
            )
                .into_response(),
            Self::Upstream(detail) => {
                tracing::error!(%detail, "request failed on an upstream dependency");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Something went wrong" })),
                )
                    .into_response()
            }
        }
    }
}

/// RepositoryError
///
/// Persistence-layer failures. Unique-constraint conflicts surface as a
/// field violation (the one user-correctable case); everything else is an
/// upstream failure.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0} already exists")]
    Duplicate(&'static str),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Duplicate(field) => {
                Self::ValidationFailed(vec![FieldViolation::new(field, "is already taken")])
            }
            RepositoryError::Database(err) => Self::upstream("database", err),
        }
    }
}

/// StorageError
///
/// Object-storage failures, tagged with the object key involved so cleanup
/// paths can log what leaked.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload of {key} failed: {message}")]
    Upload { key: String, message: String },

    #[error("delete of {key} failed: {message}")]
    Delete { key: String, message: String },
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        Self::upstream("object storage", err)
    }
}
