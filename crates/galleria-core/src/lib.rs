//! Galleria Core Library
//!
//! This crate provides the domain models, error metadata, configuration and
//! constants shared by every Galleria crate.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::GalleryConfig;
pub use error::{ErrorMetadata, LogLevel};
pub use models::{GalleryItem, GalleryItemPatch, MediaKind, NewGalleryItem};
pub use storage_types::StorageBackend;
