use async_trait::async_trait;
use aws_sdk_s3 as s3;
use axum::body::Bytes;
use s3::{presigning::PresigningConfig, primitives::ByteStream};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::sync::Mutex;

/// StorageError
///
/// Failures of the object storage collaborator. The message is surfaced to API callers
/// as the `details` of a 500 response.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("presign failed: {0}")]
    Presign(String),
    #[error("put_object failed: {0}")]
    Upload(String),
    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),
}

// 1. StorageService Contract
/// StorageService
///
/// Contract for the object storage layer. The S3 client is used in deployments and
/// `MockStorageService` in tests; handlers only see `StorageState`.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if missing. Local development only.
    async fn ensure_bucket_exists(&self);

    /// Generates a time-limited URL the client can PUT the object to directly.
    ///
    /// The signature binds the content type and, when given, the exact content length,
    /// so the storage backend rejects uploads that do not match them.
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        content_length: Option<u64>,
        expires_in: Duration,
    ) -> Result<String, StorageError>;

    /// Writes the object and returns its access URL. Exactly one write per call.
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<String, StorageError>;

    /// The URL an object under `key` is readable from.
    fn object_url(&self, key: &str) -> String;
}

// 2. The Real Implementation (S3/MinIO)
/// S3StorageClient
///
/// S3-compatible client. `force_path_style(true)` keeps it working against MinIO.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
    public_url: String,
    timeout: Duration,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        public_url: &str,
        timeout: Duration,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, StorageError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| StorageError::Timeout(self.timeout))?
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            // Already-exists is reported as an error too; only worth a debug line.
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket returned an error");
        }
    }

    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        content_length: Option<u64>,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let presigning =
            PresigningConfig::expires_in(expires_in).map_err(|e| StorageError::Presign(e.to_string()))?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type);
        if let Some(length) = content_length {
            request = request.content_length(length as i64);
        }

        let presigned = self
            .bounded(async {
                request
                    .presigned(presigning)
                    .await
                    .map_err(|e| StorageError::Presign(e.to_string()))
            })
            .await?;

        Ok(presigned.uri().to_string())
    }

    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<String, StorageError> {
        let size = body.len();
        self.bounded(async {
            self.client
                .put_object()
                .bucket(&self.bucket_name)
                .key(key)
                .content_type(content_type)
                .body(ByteStream::from(body))
                .send()
                .await
                .map_err(|e| StorageError::Upload(e.to_string()))
        })
        .await?;

        tracing::info!(key = %key, size, "object stored");
        Ok(self.object_url(key))
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_url, self.bucket_name, key)
    }
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments so a caller-influenced key cannot escape its prefix.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

// 3. The Mock Implementation (For Tests)
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub key: String,
    pub content_type: String,
    pub size: usize,
}

/// MockStorageService
///
/// In-memory stand-in for the S3 client. Records every write so tests can assert
/// that a path performed exactly one (or zero) storage writes.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    objects: Arc<Mutex<Vec<StoredObject>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub async fn stored_objects(&self) -> Vec<StoredObject> {
        self.objects.lock().await.clone()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        content_length: Option<u64>,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Presign(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }

        let mut url = format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake&content-type={}&expires={}",
            sanitize_key(key),
            content_type,
            expires_in.as_secs()
        );
        if let Some(length) = content_length {
            url.push_str(&format!("&content-length={length}"));
        }
        Ok(url)
    }

    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Upload(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }

        self.objects.lock().await.push(StoredObject {
            key: key.to_string(),
            content_type: content_type.to_string(),
            size: body.len(),
        });
        Ok(self.object_url(key))
    }

    fn object_url(&self, key: &str) -> String {
        format!("http://localhost:9000/mock-bucket/{}", sanitize_key(key))
    }
}

/// StorageState
///
/// Shared handle to the storage service held in `AppState`.
pub type StorageState = Arc<dyn StorageService>;
