//! Galleria Storage Library
//!
//! This crate provides the object-store abstraction used by the ingestion
//! pipeline, plus S3 and local filesystem implementations.
//!
//! # Storage key format
//!
//! Every gallery object lives under `gallery/`:
//!
//! - images: `gallery/images/img-{unix_millis}-{token}.{ext}`
//! - videos: `gallery/videos/vid-{unix_millis}-{token}.{ext}`
//! - video thumbnails: `gallery/videos/thumb-{unix_millis}-{token}.jpg`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in
//! the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use galleria_core::StorageBackend;
pub use keys::{key_from_ref, ObjectKeyAllocator};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult, StoredObject};
