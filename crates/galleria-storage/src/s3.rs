use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutMode, PutOptions, PutPayload,
    Result as ObjectResult,
};

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    public_base_url: Option<String>,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `public_base_url` - Optional base URL objects are served from (e.g. a CDN
    ///   origin); defaults to the bucket URL
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        public_base_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
            public_base_url,
        })
    }

    /// Generate public URL for S3 object
    ///
    /// Uses the configured public base URL when present, then the custom
    /// endpoint (path-style), then the standard AWS virtual-hosted URL.
    fn generate_url(&self, key: &str) -> String {
        if let Some(ref base) = self.public_base_url {
            format!("{}/{}", base.trim_end_matches('/'), key)
        } else if let Some(ref endpoint) = self.endpoint_url {
            format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }
}

fn is_missing_bucket(err: &ObjectStoreError) -> bool {
    matches!(err, ObjectStoreError::NotFound { .. }) || err.to_string().contains("NoSuchBucket")
}

#[async_trait]
impl Storage for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn bucket_exists(&self) -> StorageResult<bool> {
        let result: ObjectResult<_> = self.store.list_with_delimiter(None).await;
        match result {
            Ok(_) => Ok(true),
            Err(e) if is_missing_bucket(&e) => {
                tracing::warn!(bucket = %self.bucket, error = %e, "S3 bucket not found");
                Ok(false)
            }
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn put(&self, storage_key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        validate_key(storage_key)?;
        let size = data.len() as u64;
        let location = Path::from(storage_key.to_string());

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let options = PutOptions {
            mode: PutMode::Create,
            attributes,
            ..Default::default()
        };

        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(data), options)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            match e {
                ObjectStoreError::AlreadyExists { .. } | ObjectStoreError::Precondition { .. } => {
                    StorageError::AlreadyExists(storage_key.to_string())
                }
                other => StorageError::UploadFailed(other.to_string()),
            }
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn public_url(&self, storage_key: &str) -> StorageResult<String> {
        validate_key(storage_key)?;
        Ok(self.generate_url(storage_key))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        validate_key(storage_key)?;
        let start = std::time::Instant::now();
        let location = Path::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(_) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<StoredObject>> {
        let start = std::time::Instant::now();
        // object_store lists whole path segments; list the enclosing directory
        // and filter on the full prefix.
        let directory = match prefix.rfind('/') {
            Some(idx) => &prefix[..idx],
            None => "",
        };
        let location = (!directory.is_empty()).then(|| Path::from(directory.to_string()));

        let metas: Vec<_> = self
            .store
            .list(location.as_ref())
            .try_collect()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, bucket = %self.bucket, prefix = %prefix, "S3 list failed");
                StorageError::ListFailed(e.to_string())
            })?;

        let objects: Vec<StoredObject> = metas
            .into_iter()
            .map(|meta| StoredObject {
                key: meta.location.to_string(),
                size: meta.size,
                last_modified: meta.last_modified,
            })
            .filter(|object| object.key.starts_with(prefix))
            .collect();

        tracing::debug!(
            bucket = %self.bucket,
            prefix = %prefix,
            count = objects.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 list completed"
        );

        Ok(objects)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
