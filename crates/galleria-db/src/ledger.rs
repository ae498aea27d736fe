use async_trait::async_trait;
use galleria_core::{GalleryItem, GalleryItemPatch, MediaKind, NewGalleryItem};
use uuid::Uuid;

use crate::error::LedgerResult;

/// Metadata store for gallery items.
///
/// Every read that decides visibility or quota only considers active rows.
/// Rows are never hard-deleted.
#[async_trait]
pub trait GalleryLedger: Send + Sync {
    /// Number of active items of `kind`.
    async fn count_active(&self, kind: MediaKind) -> LedgerResult<i64>;

    /// Insert a new active item unless `ceiling` active items of the same
    /// kind already exist. The count and the insert are atomic; a full kind
    /// yields [`LedgerError::QuotaExceeded`](crate::LedgerError::QuotaExceeded).
    async fn insert(&self, item: NewGalleryItem, ceiling: i64) -> LedgerResult<GalleryItem>;

    /// Fetch an item if it exists and is active.
    async fn get_active(&self, id: Uuid) -> LedgerResult<Option<GalleryItem>>;

    /// Mark an active item as retired. Returns the item as it was retired,
    /// or `None` if it was missing or already retired.
    async fn soft_delete(&self, id: Uuid) -> LedgerResult<Option<GalleryItem>>;

    /// Apply an edit to an active item and bump `updated_at`.
    async fn update(&self, id: Uuid, patch: GalleryItemPatch) -> LedgerResult<Option<GalleryItem>>;

    /// Active items ordered by `featured desc, order_index asc, created_at desc`,
    /// optionally restricted to one kind.
    async fn list_active(&self, kind: Option<MediaKind>) -> LedgerResult<Vec<GalleryItem>>;

    /// Every object reference (primary and thumbnail) held by an active item.
    async fn active_object_refs(&self) -> LedgerResult<Vec<String>>;
}
