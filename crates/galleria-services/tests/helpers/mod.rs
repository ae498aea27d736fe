//! Test doubles and fixtures shared by the service integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use galleria_core::{GalleryConfig, GalleryItem, GalleryItemPatch, MediaKind, NewGalleryItem};
use galleria_db::{GalleryLedger, LedgerError, LedgerResult, MemoryLedger};
use galleria_storage::{Storage, StorageBackend, StorageError, StorageResult, StoredObject};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

pub const PUBLIC_BASE: &str = "https://media.example.test/school";

struct StoredBlob {
    data: Bytes,
    content_type: String,
    last_modified: DateTime<Utc>,
}

/// In-memory object store that counts calls and can be told to fail.
pub struct MemoryStorage {
    bucket_exists: AtomicBool,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
    objects: Mutex<HashMap<String, StoredBlob>>,
    puts: AtomicUsize,
    deletes: Mutex<Vec<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            bucket_exists: AtomicBool::new(true),
            fail_puts: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            objects: Mutex::new(HashMap::new()),
            puts: AtomicUsize::new(0),
            deletes: Mutex::new(Vec::new()),
        }
    }

    pub fn without_bucket() -> Self {
        let storage = Self::new();
        storage.bucket_exists.store(false, Ordering::SeqCst);
        storage
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of `put` calls, successful or not.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Keys passed to `delete`, in call order.
    pub fn delete_calls(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn object(&self, key: &str) -> Option<(Bytes, String)> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|blob| (blob.data.clone(), blob.content_type.clone()))
    }

    /// Place an object directly, as if uploaded `age` ago.
    pub fn seed(&self, key: &str, age: Duration) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredBlob {
                data: Bytes::from_static(b"seed"),
                content_type: "application/octet-stream".to_string(),
                last_modified: Utc::now() - age,
            },
        );
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn bucket(&self) -> &str {
        "school"
    }

    async fn bucket_exists(&self) -> StorageResult<bool> {
        Ok(self.bucket_exists.load(Ordering::SeqCst))
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed("injected failure".to_string()));
        }
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(key) {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        objects.insert(
            key.to_string(),
            StoredBlob {
                data,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn public_url(&self, key: &str) -> StorageResult<String> {
        Ok(format!("{}/{}", PUBLIC_BASE, key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.deletes.lock().unwrap().push(key.to_string());
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed("injected failure".to_string()));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<StoredObject>> {
        let objects = self.objects.lock().unwrap();
        let mut listed: Vec<StoredObject> = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, blob)| StoredObject {
                key: key.clone(),
                size: blob.data.len() as u64,
                last_modified: blob.last_modified,
            })
            .collect();
        listed.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(listed)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Ledger wrapper that can fail or refuse inserts.
pub struct FlakyLedger {
    inner: MemoryLedger,
    fail_inserts: AtomicBool,
    /// Refuse inserts as if another uploader took the last slot.
    lose_quota_race: AtomicBool,
}

impl FlakyLedger {
    pub fn new() -> Self {
        Self {
            inner: MemoryLedger::new(),
            fail_inserts: AtomicBool::new(false),
            lose_quota_race: AtomicBool::new(false),
        }
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn lose_quota_race(&self, lose: bool) {
        self.lose_quota_race.store(lose, Ordering::SeqCst);
    }

    pub async fn all_rows(&self) -> Vec<GalleryItem> {
        self.inner.all_rows().await
    }
}

#[async_trait]
impl GalleryLedger for FlakyLedger {
    async fn count_active(&self, kind: MediaKind) -> LedgerResult<i64> {
        self.inner.count_active(kind).await
    }

    async fn insert(&self, item: NewGalleryItem, ceiling: i64) -> LedgerResult<GalleryItem> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("injected failure".to_string()));
        }
        if self.lose_quota_race.load(Ordering::SeqCst) {
            return Err(LedgerError::QuotaExceeded {
                kind: item.media_kind,
                current: ceiling,
                limit: ceiling,
            });
        }
        self.inner.insert(item, ceiling).await
    }

    async fn get_active(&self, id: Uuid) -> LedgerResult<Option<GalleryItem>> {
        self.inner.get_active(id).await
    }

    async fn soft_delete(&self, id: Uuid) -> LedgerResult<Option<GalleryItem>> {
        self.inner.soft_delete(id).await
    }

    async fn update(&self, id: Uuid, patch: GalleryItemPatch) -> LedgerResult<Option<GalleryItem>> {
        self.inner.update(id, patch).await
    }

    async fn list_active(&self, kind: Option<MediaKind>) -> LedgerResult<Vec<GalleryItem>> {
        self.inner.list_active(kind).await
    }

    async fn active_object_refs(&self) -> LedgerResult<Vec<String>> {
        self.inner.active_object_refs().await
    }
}

pub fn test_config(video_enabled: bool) -> GalleryConfig {
    let mut vars = HashMap::new();
    vars.insert("STORAGE_BACKEND".to_string(), "local".to_string());
    vars.insert("LOCAL_STORAGE_PATH".to_string(), "/tmp/galleria-test".to_string());
    vars.insert(
        "LOCAL_STORAGE_BASE_URL".to_string(),
        "http://localhost:3000/media".to_string(),
    );
    vars.insert("GALLERY_VIDEO_ENABLED".to_string(), video_enabled.to_string());
    GalleryConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

/// Small gradient PNG.
pub fn png_bytes(width: u32, height: u32) -> Bytes {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    Bytes::from(encode(DynamicImage::ImageRgb8(img), ImageFormat::Png))
}

pub fn jpeg_bytes(width: u32, height: u32) -> Bytes {
    let img = RgbImage::from_pixel(width, height, Rgb([10, 200, 90]));
    Bytes::from(encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg))
}

/// Photo-like JPEG: smooth gradients with per-pixel grain, so it does not
/// compress away to nothing.
pub fn photo_jpeg_bytes(width: u32, height: u32) -> Bytes {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let grain = (x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503)) >> 29;
        Rgb([
            ((x * 255 / width) + grain).min(255) as u8,
            ((y * 255 / height) + grain).min(255) as u8,
            (((x + y) * 255 / (width + height)) + grain).min(255) as u8,
        ])
    });
    Bytes::from(encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg))
}

/// A few bytes that look like an MP4 container.
pub fn mp4_bytes() -> Bytes {
    let mut data = vec![0x00, 0x00, 0x00, 0x18];
    data.extend_from_slice(b"ftypmp42");
    data.extend_from_slice(&[0u8; 64]);
    Bytes::from(data)
}
