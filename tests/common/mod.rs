use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower_sessions::MemoryStore;

use camp_portal::{
    AppConfig, AppState, MockStorageService, create_router,
    error::RepositoryError,
    models::{
        Campground, CampgroundDetailView, CampgroundId, CampgroundInput, Image, Review, ReviewId,
        ReviewInput, User, UserId,
    },
    repository::{Repository, RepositoryState},
    storage::StorageState,
};

// --- In-Memory Repository ---

/// Backing arena for the in-memory repository: one store per entity type,
/// insertion-ordered so listing semantics match the Postgres implementation.
#[derive(Default)]
struct Arena {
    users: Vec<User>,
    campgrounds: Vec<Campground>,
    images: HashMap<CampgroundId, Vec<Image>>,
    reviews: Vec<Review>,
}

/// InMemoryRepository
///
/// A full `Repository` implementation over a mutexed arena, so the entire
/// HTTP surface can be exercised without a Postgres instance. Mirrors the
/// referential behavior of the real schema: unique usernames, parent checks
/// on review insert, and cascade on campground delete.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    inner: Arc<Mutex<Arena>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_user(&self, user: User) -> Result<User, RepositoryError> {
        let mut arena = self.inner.lock().unwrap();
        if arena.users.iter().any(|u| u.username == user.username) {
            return Err(RepositoryError::Duplicate("username"));
        }
        arena.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let arena = self.inner.lock().unwrap();
        Ok(arena.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let arena = self.inner.lock().unwrap();
        Ok(arena.users.iter().find(|u| u.username == username).cloned())
    }

    async fn list_campgrounds(&self) -> Result<Vec<Campground>, RepositoryError> {
        let arena = self.inner.lock().unwrap();
        // Newest first, like the Postgres ORDER BY created_at DESC.
        Ok(arena.campgrounds.iter().rev().cloned().collect())
    }

    async fn get_campground(
        &self,
        id: CampgroundId,
    ) -> Result<Option<Campground>, RepositoryError> {
        let arena = self.inner.lock().unwrap();
        Ok(arena.campgrounds.iter().find(|c| c.id == id).cloned())
    }

    async fn create_campground(
        &self,
        input: CampgroundInput,
        owner_id: UserId,
        images: Vec<Image>,
    ) -> Result<Campground, RepositoryError> {
        let now = Utc::now();
        let campground = Campground {
            id: CampgroundId::new(),
            owner_id,
            title: input.title,
            description: input.description,
            location: input.location,
            price: input.price,
            created_at: now,
            updated_at: now,
        };
        let mut arena = self.inner.lock().unwrap();
        arena.images.insert(campground.id, images);
        arena.campgrounds.push(campground.clone());
        Ok(campground)
    }

    async fn update_campground(
        &self,
        id: CampgroundId,
        input: CampgroundInput,
        new_images: Vec<Image>,
    ) -> Result<Option<Campground>, RepositoryError> {
        let mut arena = self.inner.lock().unwrap();
        let Some(campground) = arena.campgrounds.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        campground.title = input.title;
        campground.description = input.description;
        campground.location = input.location;
        campground.price = input.price;
        campground.updated_at = Utc::now();
        let updated = campground.clone();
        arena.images.entry(id).or_default().extend(new_images);
        Ok(Some(updated))
    }

    async fn delete_campground(&self, id: CampgroundId) -> Result<bool, RepositoryError> {
        let mut arena = self.inner.lock().unwrap();
        let before = arena.campgrounds.len();
        arena.campgrounds.retain(|c| c.id != id);
        if arena.campgrounds.len() == before {
            return Ok(false);
        }
        // Cascade, as the schema's ON DELETE CASCADE does.
        arena.images.remove(&id);
        arena.reviews.retain(|r| r.campground_id != id);
        Ok(true)
    }

    async fn get_campground_images(
        &self,
        id: CampgroundId,
    ) -> Result<Vec<Image>, RepositoryError> {
        let arena = self.inner.lock().unwrap();
        Ok(arena.images.get(&id).cloned().unwrap_or_default())
    }

    async fn create_review(
        &self,
        campground_id: CampgroundId,
        author_id: UserId,
        input: ReviewInput,
    ) -> Result<Option<Review>, RepositoryError> {
        let mut arena = self.inner.lock().unwrap();
        // Parent existence is re-checked at insert time, like the FK does.
        if !arena.campgrounds.iter().any(|c| c.id == campground_id) {
            return Ok(None);
        }
        let author_username = arena
            .users
            .iter()
            .find(|u| u.id == author_id)
            .map(|u| u.username.clone());
        let review = Review {
            id: ReviewId::new(),
            campground_id,
            author_id,
            rating: input.rating,
            body: input.body,
            created_at: Utc::now(),
            author_username,
        };
        arena.reviews.push(review.clone());
        Ok(Some(review))
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let arena = self.inner.lock().unwrap();
        Ok(arena.reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn list_reviews(
        &self,
        campground_id: CampgroundId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let arena = self.inner.lock().unwrap();
        Ok(arena
            .reviews
            .iter()
            .filter(|r| r.campground_id == campground_id)
            .cloned()
            .collect())
    }

    async fn delete_review(&self, id: ReviewId) -> Result<bool, RepositoryError> {
        let mut arena = self.inner.lock().unwrap();
        let before = arena.reviews.len();
        arena.reviews.retain(|r| r.id != id);
        Ok(arena.reviews.len() != before)
    }
}

// --- Test Application ---

pub struct TestApp {
    pub address: String,
    pub repo: InMemoryRepository,
    pub storage: MockStorageService,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_storage(MockStorageService::new()).await
}

/// Boots the full router (sessions, guards, error boundary and all) against
/// the in-memory repository and the given mock storage, served on an
/// ephemeral local port.
pub async fn spawn_app_with_storage(storage: MockStorageService) -> TestApp {
    let repo = InMemoryRepository::new();
    let state = AppState {
        repo: Arc::new(repo.clone()) as RepositoryState,
        storage: Arc::new(storage.clone()) as StorageState,
        config: AppConfig::default(),
    };
    let router = create_router(state, MemoryStore::default());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        storage,
    }
}

// --- Client Helpers ---

/// A client with a cookie store (sessions work across requests) and
/// redirect-following disabled, so tests can assert the 303s themselves.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to build client")
}

pub async fn register(
    client: &reqwest::Client,
    address: &str,
    username: &str,
    password: &str,
) -> reqwest::Response {
    client
        .post(format!("{address}/register"))
        .form(&[("username", username), ("password", password)])
        .send()
        .await
        .expect("register request failed")
}

pub async fn login(
    client: &reqwest::Client,
    address: &str,
    username: &str,
    password: &str,
) -> reqwest::Response {
    client
        .post(format!("{address}/login"))
        .form(&[("username", username), ("password", password)])
        .send()
        .await
        .expect("login request failed")
}

/// Inserts a user directly into the arena for tests that authenticate via
/// the local `x-user-id` bypass. The hash is junk because credential
/// verification never runs for these users.
pub async fn seed_user(repo: &InMemoryRepository, username: &str) -> User {
    let user = User {
        id: UserId::new(),
        username: username.to_string(),
        password_hash: "unused".to_string(),
        created_at: Utc::now(),
    };
    repo.create_user(user).await.expect("seed user")
}

/// The Location header of a redirect response.
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .expect("missing Location header")
        .to_str()
        .expect("non-utf8 Location header")
        .to_string()
}

/// A campground multipart form with the standard text fields.
pub fn campground_form(title: &str, location: &str, price: &str) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new()
        .text("title", title.to_string())
        .text("location", location.to_string())
        .text("description", "A quiet spot under the pines".to_string())
        .text("price", price.to_string())
}

/// Attaches one image file part to a campground form.
pub fn with_image(
    form: reqwest::multipart::Form,
    filename: &str,
    bytes: Vec<u8>,
) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name(filename.to_string())
        .mime_str("image/jpeg")
        .expect("image part");
    form.part("image", part)
}

/// Creates a campground through the API as `user` (bypass auth) and returns
/// its detail path ("/campgrounds/{id}").
pub async fn create_campground(
    client: &reqwest::Client,
    address: &str,
    user: &User,
    title: &str,
    price: &str,
) -> String {
    let response = client
        .post(format!("{address}/campgrounds"))
        .header("x-user-id", user.id.to_string())
        .multipart(campground_form(title, "Test Valley", price))
        .send()
        .await
        .expect("create campground request failed");
    assert_eq!(response.status(), 303, "campground creation should redirect");
    location(&response)
}

/// Fetches a campground detail view as an anonymous client.
pub async fn fetch_detail(
    client: &reqwest::Client,
    address: &str,
    detail_path: &str,
) -> CampgroundDetailView {
    client
        .get(format!("{address}{detail_path}"))
        .send()
        .await
        .expect("detail request failed")
        .json()
        .await
        .expect("detail body was not a campground view")
}
