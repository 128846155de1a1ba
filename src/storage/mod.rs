//! Object storage layer
//!
//! Route handlers talk to the bucket through [`ObjectStore`]. Two backends
//! are provided:
//! - [`S3Storage`] - any S3-compatible service, via `rust-s3`
//! - [`MemoryStorage`] - a process-local map for tests and local runs

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::StorageConfig;

pub mod memory;
pub mod s3_client;

pub use memory::MemoryStorage;
pub use s3_client::S3Storage;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage configuration error: {0}")]
    Config(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage service error: {0}")]
    Remote(String),
}

impl From<s3::error::S3Error> for StorageError {
    fn from(e: s3::error::S3Error) -> Self {
        StorageError::Remote(e.to_string())
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// A bucket that objects can be written to, listed from and read back.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the bucket this store is bound to.
    fn bucket(&self) -> &str;

    /// Short backend name, used in logs and the health endpoint.
    fn provider(&self) -> &'static str;

    /// Store `data` under `key`, replacing any existing object.
    async fn put_object(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Keys from the first listing page only, in the order the backend
    /// returns them. Buckets larger than one page are truncated.
    async fn list_keys(&self) -> StorageResult<Vec<String>>;

    async fn get_object(&self, key: &str) -> StorageResult<Bytes>;
}

/// Build the store selected by `config.provider`.
pub fn build_store(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    match config.provider.to_ascii_lowercase().as_str() {
        "s3" => Ok(Arc::new(S3Storage::new(config)?)),
        "memory" => Ok(Arc::new(MemoryStorage::new(config.bucket.clone()))),
        other => Err(StorageError::Config(format!(
            "unknown storage provider '{}'",
            other
        ))),
    }
}
