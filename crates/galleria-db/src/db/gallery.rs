//! Gallery ledger repository: the gallery_items table.

use async_trait::async_trait;
use galleria_core::{GalleryItem, GalleryItemPatch, MediaKind, NewGalleryItem};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;
use validator::Validate;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::GalleryLedger;

const ITEM_COLUMNS: &str = "id, media_kind, title, primary_object_ref, thumbnail_object_ref, \
     featured, active, order_index, uploaded_by, created_at, updated_at";

/// PostgreSQL-backed ledger.
#[derive(Clone)]
pub struct PostgresGalleryLedger {
    pool: PgPool,
}

impl PostgresGalleryLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Advisory lock key serializing inserts of one kind.
fn quota_lock_key(kind: MediaKind) -> String {
    format!("gallery_items:{}", kind.as_str())
}

#[async_trait]
impl GalleryLedger for PostgresGalleryLedger {
    #[tracing::instrument(skip(self), fields(db.table = "gallery_items", db.operation = "count"))]
    async fn count_active(&self, kind: MediaKind) -> LedgerResult<i64> {
        let count: i64 = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM gallery_items WHERE media_kind = $1 AND active",
        )
        .bind(kind)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    #[tracing::instrument(
        skip(self, item),
        fields(db.table = "gallery_items", db.operation = "insert", media_kind = %item.media_kind)
    )]
    async fn insert(&self, item: NewGalleryItem, ceiling: i64) -> LedgerResult<GalleryItem> {
        item.validate()?;
        let kind = item.media_kind;

        let mut tx = self.pool.begin().await?;

        // Released at commit or rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(quota_lock_key(kind))
            .execute(&mut *tx)
            .await?;

        let current: i64 = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM gallery_items WHERE media_kind = $1 AND active",
        )
        .bind(kind)
        .fetch_one(&mut *tx)
        .await?;

        if current >= ceiling {
            tx.rollback().await?;
            return Err(LedgerError::QuotaExceeded {
                kind,
                current,
                limit: ceiling,
            });
        }

        let row: GalleryItem = sqlx::query_as::<Postgres, GalleryItem>(&format!(
            r#"
            INSERT INTO gallery_items
                (media_kind, title, primary_object_ref, thumbnail_object_ref, uploaded_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(kind)
        .bind(&item.title)
        .bind(&item.primary_object_ref)
        .bind(&item.thumbnail_object_ref)
        .bind(item.uploaded_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            item_id = %row.id,
            media_kind = %kind,
            active_count = current + 1,
            limit = ceiling,
            "Gallery item recorded"
        );

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "gallery_items", db.record_id = %id))]
    async fn get_active(&self, id: Uuid) -> LedgerResult<Option<GalleryItem>> {
        let row = sqlx::query_as::<Postgres, GalleryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM gallery_items WHERE id = $1 AND active"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    #[tracing::instrument(
        skip(self),
        fields(db.table = "gallery_items", db.operation = "soft_delete", db.record_id = %id)
    )]
    async fn soft_delete(&self, id: Uuid) -> LedgerResult<Option<GalleryItem>> {
        // The `active` predicate makes concurrent retires race-free: only one
        // of them gets the row back.
        let row = sqlx::query_as::<Postgres, GalleryItem>(&format!(
            r#"
            UPDATE gallery_items
            SET active = FALSE, updated_at = NOW()
            WHERE id = $1 AND active
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    #[tracing::instrument(
        skip(self, patch),
        fields(db.table = "gallery_items", db.operation = "update", db.record_id = %id)
    )]
    async fn update(&self, id: Uuid, patch: GalleryItemPatch) -> LedgerResult<Option<GalleryItem>> {
        let patch = patch.normalized();
        patch.validate()?;

        let title_set = patch.title.is_some();
        let title = patch.title.flatten();

        let row = sqlx::query_as::<Postgres, GalleryItem>(&format!(
            r#"
            UPDATE gallery_items
            SET title = CASE WHEN $2 THEN $3 ELSE title END,
                featured = COALESCE($4, featured),
                order_index = COALESCE($5, order_index),
                updated_at = NOW()
            WHERE id = $1 AND active
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(title_set)
        .bind(title)
        .bind(patch.featured)
        .bind(patch.order_index)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "gallery_items", db.operation = "list"))]
    async fn list_active(&self, kind: Option<MediaKind>) -> LedgerResult<Vec<GalleryItem>> {
        let rows = sqlx::query_as::<Postgres, GalleryItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS} FROM gallery_items
            WHERE active AND ($1::gallery_media_kind IS NULL OR media_kind = $1)
            ORDER BY featured DESC, order_index ASC, created_at DESC
            "#
        ))
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "gallery_items", db.operation = "refs"))]
    async fn active_object_refs(&self) -> LedgerResult<Vec<String>> {
        let refs: Vec<String> = sqlx::query_scalar::<Postgres, String>(
            r#"
            SELECT primary_object_ref FROM gallery_items WHERE active
            UNION ALL
            SELECT thumbnail_object_ref FROM gallery_items
            WHERE active AND thumbnail_object_ref IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(refs)
    }
}
