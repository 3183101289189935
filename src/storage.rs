use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::StorageError;
use crate::models::Image;

// 1. StorageService Contract
/// StorageService
///
/// Defines the abstract contract for all interactions with the object storage
/// layer. This trait allows us to swap the concrete implementation — the real
/// S3 client (S3StorageClient) in production, the in-memory Mock
/// (MockStorageService) during testing — without affecting the calling
/// handlers.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured bucket exists. Used in the `Env::Local` setup
    /// to automatically provision the required bucket in MinIO. No-op in
    /// production.
    async fn ensure_bucket_exists(&self);

    /// Uploads one object and returns its public URL plus the storage key
    /// needed to delete it again.
    async fn upload_object(
        &self,
        key: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<Image, StorageError>;

    /// Deletes one previously uploaded object by key.
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;
}

/// StorageState
///
/// The concrete type used to share the storage service access across the
/// application state.
pub type StorageState = Arc<dyn StorageService>;

/// UploadPart
///
/// One file part lifted out of a multipart submission, ready to stream to
/// the storage service.
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// object_key
///
/// Generates a unique, structured object key (`campgrounds/UUID.ext`) for an
/// uploaded file, deriving the extension from the sanitized client filename.
pub fn object_key(filename: &str) -> String {
    let sanitized = sanitize_key(filename);
    let extension = std::path::Path::new(&sanitized)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("bin");
    format!("campgrounds/{}.{}", Uuid::new_v4(), extension)
}

/// sanitize_key
///
/// Utility function to prevent path traversal attacks by removing directory
/// navigation components (e.g., `..`, `.`) from a user-provided key segment.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// store_images
///
/// Uploads a batch of multipart file parts. Atomic from the caller's
/// perspective: if any part fails to upload, the objects already uploaded in
/// this batch are deleted again and the error is returned — the caller never
/// sees a mix of stored and unstored images. An empty batch is valid and
/// returns an empty locator list.
pub async fn store_images(
    storage: &dyn StorageService,
    parts: Vec<UploadPart>,
) -> Result<Vec<Image>, StorageError> {
    let mut stored = Vec::with_capacity(parts.len());
    for part in parts {
        let key = object_key(&part.filename);
        match storage
            .upload_object(&key, &part.content_type, part.data)
            .await
        {
            Ok(image) => stored.push(image),
            Err(err) => {
                discard_images(storage, &stored).await;
                return Err(err);
            }
        }
    }
    Ok(stored)
}

/// discard_images
///
/// Best-effort compensating cleanup: deletes a set of already-uploaded
/// objects after a later pipeline step failed. Individual delete failures
/// are logged and skipped; the objects they leave behind are the known
/// resource-leak window.
pub async fn discard_images(storage: &dyn StorageService, images: &[Image]) {
    for image in images {
        if let Err(err) = storage.delete_object(&image.key).await {
            tracing::warn!(key = %image.key, error = %err, "failed to clean up stored object");
        }
    }
}

// 2. The Real Implementation (S3/MinIO)
/// S3StorageClient
///
/// The concrete implementation using the AWS SDK for S3. Due to S3
/// compatibility, this client transparently handles connections to a
/// Dockerized MinIO instance locally and any S3-compatible endpoint in
/// production.
///
/// `force_path_style(true)` is required for MinIO-style API gateways, and
/// means the public URL of an object is `endpoint/bucket/key`.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
    // Base for the public URLs recorded against uploaded objects.
    public_base: String,
}

impl S3StorageClient {
    /// new
    ///
    /// Constructs the S3 client using credentials and configuration from AppConfig.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            // Path-style addressing (http://endpoint/bucket/key) is required
            // for MinIO-compatible gateways.
            .force_path_style(true)
            .build();

        let client = s3::Client::from_conf(config);

        Self {
            client,
            bucket_name: bucket.to_string(),
            public_base: format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// ensure_bucket_exists
    ///
    /// Calls the S3 CreateBucket API. Since S3 APIs are idempotent, this only
    /// creates the bucket if it does not already exist. Safe to call at startup.
    async fn ensure_bucket_exists(&self) {
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await;
    }

    async fn upload_object(
        &self,
        key: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<Image, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|err| StorageError::Upload {
                key: key.to_string(),
                message: err.to_string(),
            })?;

        Ok(Image {
            url: format!("{}/{}", self.public_base, key),
            key: key.to_string(),
        })
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|err| StorageError::Delete {
                key: key.to_string(),
                message: err.to_string(),
            })?;
        Ok(())
    }
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// An in-memory implementation of `StorageService` used for unit and
/// integration testing. It records uploaded keys so tests can assert exactly
/// which objects a pipeline run left behind, and can be configured to start
/// failing after a number of successful uploads to exercise the atomic-batch
/// cleanup path.
#[derive(Clone, Default)]
pub struct MockStorageService {
    uploaded: Arc<Mutex<Vec<String>>>,
    // Uploads beyond this count return a simulated failure. None = never fail.
    fail_after: Option<usize>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    /// All operations fail immediately.
    pub fn new_failing() -> Self {
        Self::failing_after(0)
    }

    /// The first `uploads` uploads succeed; every one after that fails.
    pub fn failing_after(uploads: usize) -> Self {
        Self {
            uploaded: Arc::new(Mutex::new(Vec::new())),
            fail_after: Some(uploads),
        }
    }

    /// The keys currently held by the mock store, in upload order.
    pub fn stored_keys(&self) -> Vec<String> {
        self.uploaded.lock().expect("mock storage lock").clone()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {
        // No-op in mock environment.
    }

    async fn upload_object(
        &self,
        key: &str,
        _content_type: &str,
        _data: Vec<u8>,
    ) -> Result<Image, StorageError> {
        let mut uploaded = self.uploaded.lock().expect("mock storage lock");
        if let Some(limit) = self.fail_after {
            if uploaded.len() >= limit {
                return Err(StorageError::Upload {
                    key: key.to_string(),
                    message: "Mock Storage Error: Simulation requested".to_string(),
                });
            }
        }

        let sanitized_key = sanitize_key(key);
        uploaded.push(sanitized_key.clone());

        // Returns a deterministic, local-style URL for mock assertions.
        Ok(Image {
            url: format!("http://localhost:9000/mock-bucket/{sanitized_key}"),
            key: sanitized_key,
        })
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.uploaded
            .lock()
            .expect("mock storage lock")
            .retain(|stored| stored != key);
        Ok(())
    }
}
