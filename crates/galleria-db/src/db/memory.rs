//! In-process ledger with the same semantics as the PostgreSQL one.

use async_trait::async_trait;
use chrono::Utc;
use galleria_core::{GalleryItem, GalleryItemPatch, MediaKind, NewGalleryItem};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;
use validator::Validate;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::GalleryLedger;

/// Ledger kept in memory. Clones share the same rows.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    items: Arc<Mutex<Vec<GalleryItem>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row, retired ones included, in insertion order.
    pub async fn all_rows(&self) -> Vec<GalleryItem> {
        self.items.lock().await.clone()
    }
}

fn listing_order(a: &GalleryItem, b: &GalleryItem) -> Ordering {
    b.featured
        .cmp(&a.featured)
        .then(a.order_index.cmp(&b.order_index))
        .then(b.created_at.cmp(&a.created_at))
}

#[async_trait]
impl GalleryLedger for MemoryLedger {
    async fn count_active(&self, kind: MediaKind) -> LedgerResult<i64> {
        let items = self.items.lock().await;
        Ok(items
            .iter()
            .filter(|item| item.active && item.media_kind == kind)
            .count() as i64)
    }

    async fn insert(&self, item: NewGalleryItem, ceiling: i64) -> LedgerResult<GalleryItem> {
        item.validate()?;
        let mut items = self.items.lock().await;

        let current = items
            .iter()
            .filter(|row| row.active && row.media_kind == item.media_kind)
            .count() as i64;
        if current >= ceiling {
            return Err(LedgerError::QuotaExceeded {
                kind: item.media_kind,
                current,
                limit: ceiling,
            });
        }

        let now = Utc::now();
        let row = GalleryItem {
            id: Uuid::new_v4(),
            media_kind: item.media_kind,
            title: item.title,
            primary_object_ref: item.primary_object_ref,
            thumbnail_object_ref: item.thumbnail_object_ref,
            featured: false,
            active: true,
            order_index: 0,
            uploaded_by: item.uploaded_by,
            created_at: now,
            updated_at: now,
        };
        items.push(row.clone());
        Ok(row)
    }

    async fn get_active(&self, id: Uuid) -> LedgerResult<Option<GalleryItem>> {
        let items = self.items.lock().await;
        Ok(items.iter().find(|item| item.id == id && item.active).cloned())
    }

    async fn soft_delete(&self, id: Uuid) -> LedgerResult<Option<GalleryItem>> {
        let mut items = self.items.lock().await;
        Ok(items
            .iter_mut()
            .find(|item| item.id == id && item.active)
            .map(|item| {
                item.active = false;
                item.updated_at = Utc::now();
                item.clone()
            }))
    }

    async fn update(&self, id: Uuid, patch: GalleryItemPatch) -> LedgerResult<Option<GalleryItem>> {
        let patch = patch.normalized();
        patch.validate()?;

        let mut items = self.items.lock().await;
        Ok(items
            .iter_mut()
            .find(|item| item.id == id && item.active)
            .map(|item| {
                patch.apply_to(item);
                item.updated_at = Utc::now();
                item.clone()
            }))
    }

    async fn list_active(&self, kind: Option<MediaKind>) -> LedgerResult<Vec<GalleryItem>> {
        let items = self.items.lock().await;
        let mut active: Vec<GalleryItem> = items
            .iter()
            .filter(|item| item.active && kind.map_or(true, |k| item.media_kind == k))
            .cloned()
            .collect();
        active.sort_by(listing_order);
        Ok(active)
    }

    async fn active_object_refs(&self) -> LedgerResult<Vec<String>> {
        let items = self.items.lock().await;
        Ok(items
            .iter()
            .filter(|item| item.active)
            .flat_map(|item| item.object_refs())
            .map(String::from)
            .collect())
    }
}
