use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::flash::Flash;
use crate::validate::FieldValue;

// --- Typed Ids ---

// Each entity type lives in its own addressable store; relationships between
// them are carried as these typed ids and resolved through the repository,
// never through raw UUIDs that could cross entity boundaries.

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            Serialize,
            Deserialize,
            sqlx::Type,
            ToSchema,
        )]
        #[sqlx(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Mints a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id! {
    /// Identifier of a registered user account.
    UserId
}
entity_id! {
    /// Identifier of a campground listing.
    CampgroundId
}
entity_id! {
    /// Identifier of a review. Only meaningful in the context of the
    /// campground id carried in the same request path.
    ReviewId
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The canonical identity record from the `users` table. The credential hash
/// is an Argon2 PHC string (salt and derivation parameters embedded) and is
/// never serialized into a response body.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct User {
    pub id: UserId,
    // The user's display handle; unique across the system.
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Campground
///
/// A campground listing from the `campgrounds` table. The owner reference is
/// set once at creation and never reassigned; images and reviews live in
/// their own stores, keyed back to this id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Campground {
    pub id: CampgroundId,
    // FK to users.id (Owner). Immutable after creation.
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Image
///
/// One stored campground image: the public URL clients fetch it from, and
/// the storage key needed to delete it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Image {
    pub url: String,
    pub key: String,
}

/// Review
///
/// A review from the `reviews` table, bound to exactly one parent campground.
/// The author's username is joined in for display, the same way the parent
/// row is joined when listing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Review {
    pub id: ReviewId,
    pub campground_id: CampgroundId,
    // FK to users.id (Author). Immutable after creation.
    pub author_id: UserId,
    pub rating: i32,
    pub body: String,
    pub created_at: DateTime<Utc>,
    // Loaded via a JOIN with users in the repository query.
    #[sqlx(default)]
    pub author_username: Option<String>,
}

// --- Validated Input Payloads ---

/// CampgroundInput
///
/// The coerced, validated campground payload. Only ever constructed from the
/// output of the schema validator, so handlers never see raw form values.
#[derive(Debug, Clone, PartialEq)]
pub struct CampgroundInput {
    pub title: String,
    pub description: String,
    pub location: String,
    pub price: f64,
}

impl CampgroundInput {
    /// Builds the input from validator output. The schema guarantees the
    /// required fields are present and well-typed; optional fields default.
    pub fn from_validated(values: &HashMap<&'static str, FieldValue>) -> Self {
        Self {
            title: values
                .get("title")
                .and_then(FieldValue::as_text)
                .unwrap_or_default(),
            description: values
                .get("description")
                .and_then(FieldValue::as_text)
                .unwrap_or_default(),
            location: values
                .get("location")
                .and_then(FieldValue::as_text)
                .unwrap_or_default(),
            price: values
                .get("price")
                .and_then(FieldValue::as_number)
                .unwrap_or_default(),
        }
    }
}

/// ReviewInput
///
/// The coerced, validated review payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewInput {
    pub rating: i32,
    pub body: String,
}

impl ReviewInput {
    pub fn from_validated(values: &HashMap<&'static str, FieldValue>) -> Self {
        Self {
            rating: values
                .get("rating")
                .and_then(FieldValue::as_integer)
                .unwrap_or_default() as i32,
            body: values
                .get("body")
                .and_then(FieldValue::as_text)
                .unwrap_or_default(),
        }
    }
}

/// CredentialsForm
///
/// Login payload. Registration goes through the schema validator instead;
/// login failure is generic regardless of which field was wrong, so there is
/// nothing field-level to report.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
}

// --- Response Views ---

// Read endpoints return these envelopes. They carry the resolved identity
// and the drained one-shot flash alongside the resource, which is the data
// the rendering boundary consumes for every page.

/// UserView
///
/// The public projection of an identity: everything a response may carry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// PageContext
///
/// The envelope for pages with no resource payload (login, new-campground
/// form): just the identity and flash state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PageContext {
    pub current_user: Option<UserView>,
    pub flash: Flash,
}

/// CampgroundListView
///
/// GET /campgrounds response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CampgroundListView {
    pub current_user: Option<UserView>,
    pub flash: Flash,
    pub campgrounds: Vec<Campground>,
}

/// CampgroundDetailView
///
/// GET /campgrounds/{id} response: the campground with its ordered images
/// and reviews (insertion order = display order).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CampgroundDetailView {
    pub current_user: Option<UserView>,
    pub flash: Flash,
    pub campground: Campground,
    pub images: Vec<Image>,
    pub reviews: Vec<Review>,
}

/// CampgroundEditView
///
/// GET /campgrounds/{id}/edit response, only reachable by the owner.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CampgroundEditView {
    pub current_user: Option<UserView>,
    pub flash: Flash,
    pub campground: Campground,
    pub images: Vec<Image>,
}
