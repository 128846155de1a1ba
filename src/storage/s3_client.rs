// S3 client backed by rust-s3

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};
use tracing::{debug, warn};

use super::{ObjectStore, StorageError, StorageResult};
use crate::config::StorageConfig;

const DEFAULT_REGION: &str = "us-east-1";

pub struct S3Storage {
    name: String,
    bucket: Arc<Bucket>,
}

impl S3Storage {
    /// Bind the configured bucket, region and credentials to a client.
    ///
    /// Nothing is sent to the service here; bad credentials or a missing
    /// bucket only show up on the first request.
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        let region = resolve_region(config)?;
        let credentials = resolve_credentials(config)?;

        let bucket = Bucket::new(&config.bucket, region, credentials)?;
        // Custom endpoints (MinIO and friends) generally need path-style URLs.
        let bucket: Arc<Bucket> = if config.endpoint.is_some() {
            Arc::from(bucket.with_path_style())
        } else {
            Arc::from(bucket)
        };

        Ok(Self {
            name: config.bucket.clone(),
            bucket,
        })
    }
}

fn resolve_region(config: &StorageConfig) -> StorageResult<Region> {
    let name = if config.region.is_empty() {
        DEFAULT_REGION.to_string()
    } else {
        config.region.clone()
    };

    match &config.endpoint {
        Some(endpoint) => Ok(Region::Custom {
            region: name,
            endpoint: endpoint.clone(),
        }),
        None => name
            .parse::<Region>()
            .map_err(|e| StorageError::Config(format!("invalid region '{}': {}", name, e))),
    }
}

fn resolve_credentials(config: &StorageConfig) -> StorageResult<Credentials> {
    let explicit = Credentials::new(
        config.access_key_id.as_deref(),
        config.secret_access_key.as_deref(),
        config.session_token.as_deref(),
        None,
        None,
    );

    match explicit {
        Ok(credentials) => Ok(credentials),
        Err(e) => {
            warn!(error = %e, "No usable S3 credentials found, falling back to anonymous access");
            Credentials::anonymous().map_err(|e| StorageError::Config(e.to_string()))
        }
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    fn bucket(&self) -> &str {
        &self.name
    }

    fn provider(&self) -> &'static str {
        "s3"
    }

    async fn put_object(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let content_type = mime_guess::from_path(key).first_or_octet_stream();
        let response = self
            .bucket
            .put_object_with_content_type(key, &data, content_type.essence_str())
            .await?;
        check_status(response.status_code(), key)?;
        debug!(key, bytes = data.len(), "Object stored");
        Ok(())
    }

    async fn list_keys(&self) -> StorageResult<Vec<String>> {
        // A single page with the service's default size. Continuation
        // tokens are intentionally not followed.
        let (page, status) = self
            .bucket
            .list_page(String::new(), None, None, None, None)
            .await?;
        check_status(status, &self.name)?;

        if page.is_truncated {
            warn!(
                bucket = %self.name,
                returned = page.contents.len(),
                "Bucket listing truncated to the first page"
            );
        }

        Ok(page.contents.into_iter().map(|object| object.key).collect())
    }

    async fn get_object(&self, key: &str) -> StorageResult<Bytes> {
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| classify_error(e, key))?;
        check_status(response.status_code(), key)?;
        Ok(response.bytes().clone())
    }
}

// rust-s3 fails non-2xx responses itself (`fail-on-err`), so a missing key
// arrives here as an error rather than as a status code.
fn classify_error(err: S3Error, key: &str) -> StorageError {
    match err {
        S3Error::HttpFailWithBody(404, _) => StorageError::NotFound(key.to_string()),
        other => StorageError::from(other),
    }
}

fn check_status(status: u16, subject: &str) -> StorageResult<()> {
    match status {
        200..=299 => Ok(()),
        other => Err(StorageError::Remote(format!(
            "unexpected status {} for '{}'",
            other, subject
        ))),
    }
}
