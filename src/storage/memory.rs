use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{ObjectStore, StorageError, StorageResult};

/// Keys beyond this many are left off a listing, mirroring the S3 page size.
pub const LIST_PAGE_SIZE: usize = 1000;

/// In-process object store keyed in lexicographic order.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    bucket: String,
    objects: Arc<RwLock<BTreeMap<String, Bytes>>>,
}

impl MemoryStorage {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Arc::default(),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn provider(&self) -> &'static str {
        "memory"
    }

    async fn put_object(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let mut guard = self.objects.write().await;
        guard.insert(key.to_string(), data);
        Ok(())
    }

    async fn list_keys(&self) -> StorageResult<Vec<String>> {
        let guard = self.objects.read().await;
        Ok(guard.keys().take(LIST_PAGE_SIZE).cloned().collect())
    }

    async fn get_object(&self, key: &str) -> StorageResult<Bytes> {
        let guard = self.objects.read().await;
        guard
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}
