//! Storage abstraction trait
//!
//! This module defines the Storage trait that all object-store backends implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// An object found while listing a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Object store abstraction
///
/// The ingestion pipeline only talks to networked storage through this trait.
/// Writes are create-only: `put` on an existing key fails with
/// [`StorageError::AlreadyExists`] instead of overwriting.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Name of the bucket this client writes to.
    fn bucket(&self) -> &str;

    /// Whether the configured bucket exists and is reachable.
    async fn bucket_exists(&self) -> StorageResult<bool>;

    /// Store `data` under `storage_key`. Never overwrites.
    async fn put(&self, storage_key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Public URL under which the object is served.
    async fn public_url(&self, storage_key: &str) -> StorageResult<String>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// List every object whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<StoredObject>>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
