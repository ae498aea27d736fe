//! Object key generation shared by all storage backends.
//!
//! Key format: `gallery/{images|videos}/{img|vid}-{unix_millis}-{token}.{ext}`.
//! The timestamp keeps keys readable when debugging; the random token makes
//! collisions between concurrent uploaders negligible without coordination.

use chrono::Utc;
use galleria_core::constants::GALLERY_PREFIX;
use galleria_core::MediaKind;
use rand::Rng;

use crate::traits::{StorageError, StorageResult};

const TOKEN_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const TOKEN_LENGTH: usize = 8;
const THUMBNAIL_PREFIX: &str = "thumb";

/// Generates storage keys for gallery objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectKeyAllocator;

impl ObjectKeyAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Allocate a key for a new primary object of `kind`.
    pub fn allocate(&self, kind: MediaKind, extension: &str) -> String {
        self.allocate_at(kind, extension, Utc::now().timestamp_millis())
    }

    /// Allocate a key for a video thumbnail.
    pub fn allocate_thumbnail(&self) -> String {
        format!(
            "{}{}/{}-{}-{}.jpg",
            GALLERY_PREFIX,
            MediaKind::Video.folder(),
            THUMBNAIL_PREFIX,
            Utc::now().timestamp_millis(),
            random_token()
        )
    }

    pub(crate) fn allocate_at(&self, kind: MediaKind, extension: &str, unix_millis: i64) -> String {
        let extension = sanitize_extension(extension);
        format!(
            "{}{}/{}-{}-{}.{}",
            GALLERY_PREFIX,
            kind.folder(),
            kind.key_prefix(),
            unix_millis,
            random_token(),
            extension
        )
    }
}

fn random_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LENGTH)
        .map(|_| TOKEN_CHARSET[rng.random_range(0..TOKEN_CHARSET.len())] as char)
        .collect()
}

fn sanitize_extension(extension: &str) -> String {
    let cleaned: String = extension
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect::<String>()
        .to_lowercase();
    if cleaned.is_empty() {
        "bin".to_string()
    } else {
        cleaned
    }
}

/// Recover the storage key from a stored public reference.
///
/// References are public URLs whose path ends with the object key; the key
/// is the suffix starting at the last gallery prefix, so a bucket that is
/// itself named `gallery` in a path-style URL is skipped. Query strings and
/// fragments are ignored.
pub fn key_from_ref(reference: &str) -> Option<String> {
    let without_query = reference
        .split(['?', '#'])
        .next()
        .unwrap_or(reference);
    let start = without_query.rfind(GALLERY_PREFIX)?;
    let key = &without_query[start..];
    if key.len() <= GALLERY_PREFIX.len() || validate_key(key).is_err() {
        return None;
    }
    Some(key.to_string())
}

/// Reject keys that could escape the bucket root.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() || storage_key.contains("..") || storage_key.starts_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            storage_key
        )));
    }
    Ok(())
}
