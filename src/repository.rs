use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::error::RepositoryError;
use crate::models::{
    Campground, CampgroundId, CampgroundInput, Image, Review, ReviewId, ReviewInput, User, UserId,
};

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. Handlers and
/// guards interact with the data layer through this trait without knowing the
/// concrete implementation (Postgres in production, an in-memory arena in
/// tests).
///
/// Each entity type lives in its own addressable store; cross-entity
/// relationships are typed ids resolved through these methods, with the
/// referential checks (parent existence, cascade) performed explicitly here.
/// Ownership is NOT checked at this layer — that is the Ownership Guard's
/// job — but every write reports whether it matched a row, so a write that
/// raced a concurrent delete surfaces as a recoverable not-found, never a
/// partial success.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    /// Inserts a new identity record. Fails with Duplicate if the username
    /// is already taken.
    async fn create_user(&self, user: User) -> Result<User, RepositoryError>;
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<User>, RepositoryError>;

    // --- Campgrounds ---
    async fn list_campgrounds(&self) -> Result<Vec<Campground>, RepositoryError>;
    async fn get_campground(&self, id: CampgroundId)
    -> Result<Option<Campground>, RepositoryError>;
    /// Persists a campground and its image locators in one transaction: the
    /// row and its images either all land or none do.
    async fn create_campground(
        &self,
        input: CampgroundInput,
        owner_id: UserId,
        images: Vec<Image>,
    ) -> Result<Campground, RepositoryError>;
    /// Applies new field values and appends any freshly uploaded images.
    /// Returns None if the campground no longer exists (raced delete).
    async fn update_campground(
        &self,
        id: CampgroundId,
        input: CampgroundInput,
        new_images: Vec<Image>,
    ) -> Result<Option<Campground>, RepositoryError>;
    /// Deletes a campground; its images and reviews cascade. Returns false
    /// if the row was already gone.
    async fn delete_campground(&self, id: CampgroundId) -> Result<bool, RepositoryError>;
    /// The campground's image locators, in display order.
    async fn get_campground_images(
        &self,
        id: CampgroundId,
    ) -> Result<Vec<Image>, RepositoryError>;

    // --- Reviews ---
    /// Inserts a review under its parent campground. Returns None if the
    /// parent does not exist at insert time (I1 is enforced here, not
    /// assumed from an earlier check).
    async fn create_review(
        &self,
        campground_id: CampgroundId,
        author_id: UserId,
        input: ReviewInput,
    ) -> Result<Option<Review>, RepositoryError>;
    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError>;
    /// Reviews for a campground in insertion order (= display order).
    async fn list_reviews(
        &self,
        campground_id: CampgroundId,
    ) -> Result<Vec<Review>, RepositoryError>;
    async fn delete_review(&self, id: ReviewId) -> Result<bool, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the
/// PostgreSQL database. Uses the runtime query API with explicit binds
/// throughout, so the crate builds without a live database connection.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CAMPGROUND_COLUMNS: &str =
    "id, owner_id, title, description, location, price, created_at, updated_at";

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    /// create_user
    ///
    /// Inserts the identity record. The unique index on `username` is the
    /// arbiter for concurrent registrations of the same handle; a violation
    /// maps to the Duplicate error rather than an opaque database failure.
    async fn create_user(&self, user: User) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, password_hash, created_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, username, password_hash, created_at",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if err
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                RepositoryError::Duplicate("username")
            } else {
                err.into()
            }
        })
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    // --- CAMPGROUNDS ---

    /// list_campgrounds
    ///
    /// Newest listings first.
    async fn list_campgrounds(&self) -> Result<Vec<Campground>, RepositoryError> {
        let campgrounds = sqlx::query_as::<_, Campground>(&format!(
            "SELECT {CAMPGROUND_COLUMNS} FROM campgrounds ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(campgrounds)
    }

    async fn get_campground(
        &self,
        id: CampgroundId,
    ) -> Result<Option<Campground>, RepositoryError> {
        let campground = sqlx::query_as::<_, Campground>(&format!(
            "SELECT {CAMPGROUND_COLUMNS} FROM campgrounds WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(campground)
    }

    /// create_campground
    ///
    /// Inserts the campground row and its image locators inside one
    /// transaction so a failure on any image insert rolls the row back too.
    async fn create_campground(
        &self,
        input: CampgroundInput,
        owner_id: UserId,
        images: Vec<Image>,
    ) -> Result<Campground, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let campground = sqlx::query_as::<_, Campground>(&format!(
            "INSERT INTO campgrounds (id, owner_id, title, description, location, price, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) \
             RETURNING {CAMPGROUND_COLUMNS}"
        ))
        .bind(CampgroundId::new())
        .bind(owner_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.location)
        .bind(input.price)
        .fetch_one(&mut *tx)
        .await?;

        insert_images(&mut tx, campground.id, &images, 0).await?;

        tx.commit().await?;
        Ok(campground)
    }

    /// update_campground
    ///
    /// Field update plus image append in one transaction. A zero-row update
    /// means the campground vanished between the guard's load and this write;
    /// that surfaces as None, which the handler maps to NotFound.
    async fn update_campground(
        &self,
        id: CampgroundId,
        input: CampgroundInput,
        new_images: Vec<Image>,
    ) -> Result<Option<Campground>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Campground>(&format!(
            "UPDATE campgrounds \
             SET title = $2, description = $3, location = $4, price = $5, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {CAMPGROUND_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.location)
        .bind(input.price)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(campground) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        // New images are appended after the existing sequence.
        let next_position: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM campground_images WHERE campground_id = $1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        insert_images(&mut tx, campground.id, &new_images, next_position).await?;

        tx.commit().await?;
        Ok(Some(campground))
    }

    /// delete_campground
    ///
    /// The `ON DELETE CASCADE` constraints remove the campground's images
    /// and reviews with it.
    async fn delete_campground(&self, id: CampgroundId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM campgrounds WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_campground_images(
        &self,
        id: CampgroundId,
    ) -> Result<Vec<Image>, RepositoryError> {
        let images = sqlx::query_as::<_, Image>(
            "SELECT url, key FROM campground_images WHERE campground_id = $1 ORDER BY position ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(images)
    }

    // --- REVIEWS ---

    /// create_review
    ///
    /// Inserts and immediately joins with `users` to return the enriched
    /// review, including the author's username. The foreign key to
    /// `campgrounds` is the final arbiter of parent existence: a violation
    /// (parent deleted concurrently) maps to None, not an error.
    async fn create_review(
        &self,
        campground_id: CampgroundId,
        author_id: UserId,
        input: ReviewInput,
    ) -> Result<Option<Review>, RepositoryError> {
        let inserted = sqlx::query_as::<_, Review>(
            "WITH inserted AS ( \
                INSERT INTO reviews (id, campground_id, author_id, rating, body, created_at) \
                VALUES ($1, $2, $3, $4, $5, NOW()) \
                RETURNING id, campground_id, author_id, rating, body, created_at \
             ) \
             SELECT i.id, i.campground_id, i.author_id, i.rating, i.body, i.created_at, \
                    u.username AS author_username \
             FROM inserted i JOIN users u ON i.author_id = u.id",
        )
        .bind(ReviewId::new())
        .bind(campground_id)
        .bind(author_id)
        .bind(input.rating)
        .bind(&input.body)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(review) => Ok(Some(review)),
            Err(err)
                if err
                    .as_database_error()
                    .is_some_and(|db| db.is_foreign_key_violation()) =>
            {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let review = sqlx::query_as::<_, Review>(
            "SELECT r.id, r.campground_id, r.author_id, r.rating, r.body, r.created_at, \
                    u.username AS author_username \
             FROM reviews r JOIN users u ON r.author_id = u.id \
             WHERE r.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(review)
    }

    /// list_reviews
    ///
    /// `seq` is a serial assigned at insert, so ordering by it is insertion
    /// order regardless of timestamp resolution.
    async fn list_reviews(
        &self,
        campground_id: CampgroundId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT r.id, r.campground_id, r.author_id, r.rating, r.body, r.created_at, \
                    u.username AS author_username \
             FROM reviews r JOIN users u ON r.author_id = u.id \
             WHERE r.campground_id = $1 \
             ORDER BY r.seq ASC",
        )
        .bind(campground_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    async fn delete_review(&self, id: ReviewId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Inserts image locators for a campground starting at `first_position`.
async fn insert_images(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    campground_id: CampgroundId,
    images: &[Image],
    first_position: i32,
) -> Result<(), RepositoryError> {
    for (offset, image) in images.iter().enumerate() {
        sqlx::query(
            "INSERT INTO campground_images (campground_id, url, key, position) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(campground_id)
        .bind(&image.url)
        .bind(&image.key)
        .bind(first_position + offset as i32)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
