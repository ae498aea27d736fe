//! Caller-facing gallery operations.

use galleria_core::{GalleryConfig, GalleryItem, GalleryItemPatch, MediaKind};
use galleria_db::{GalleryLedger, LedgerError};
use galleria_storage::Storage;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{EditError, IngestError, RetireError};
use crate::ingest::{IngestRequest, IngestionPipeline, ProgressSink};
use crate::quota::QuotaDecision;
use crate::reconcile::{OrphanReconciler, ReconcileConfig};
use crate::retention::{RetentionManager, RetireOutcome};

#[derive(Debug, Clone)]
pub enum EditOutcome {
    Updated(GalleryItem),
    NotFound,
}

/// Entry point for ingesting, editing, listing and retiring gallery items.
#[derive(Clone)]
pub struct GalleryService {
    storage: Arc<dyn Storage>,
    ledger: Arc<dyn GalleryLedger>,
    pipeline: IngestionPipeline,
    retention: RetentionManager,
    reconcile: ReconcileConfig,
    video_enabled: bool,
}

impl GalleryService {
    pub fn new(
        storage: Arc<dyn Storage>,
        ledger: Arc<dyn GalleryLedger>,
        config: &GalleryConfig,
    ) -> Self {
        Self {
            pipeline: IngestionPipeline::new(storage.clone(), ledger.clone(), config),
            retention: RetentionManager::new(storage.clone(), ledger.clone()),
            reconcile: ReconcileConfig::from_config(config),
            video_enabled: config.video_enabled,
            storage,
            ledger,
        }
    }

    pub fn is_enabled(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Image => true,
            MediaKind::Video => self.video_enabled,
        }
    }

    /// Ingest one upload. See [`IngestionPipeline::ingest`].
    pub async fn ingest(
        &self,
        request: IngestRequest,
        progress: &dyn ProgressSink,
    ) -> Result<GalleryItem, IngestError> {
        if !self.is_enabled(request.kind) {
            return Err(IngestError::KindDisabled(request.kind));
        }
        self.pipeline.ingest(request, progress).await
    }

    pub async fn retire(&self, id: Uuid) -> Result<RetireOutcome, RetireError> {
        self.retention.retire(id).await
    }

    /// Edit title, featured flag or order of an active item.
    #[tracing::instrument(skip(self, patch), fields(item_id = %id))]
    pub async fn update(&self, id: Uuid, patch: GalleryItemPatch) -> Result<EditOutcome, EditError> {
        let patch = patch.normalized();
        patch
            .validate()
            .map_err(|e| EditError::InvalidPatch(e.to_string()))?;

        if patch.is_empty() {
            return Ok(match self.ledger.get_active(id).await? {
                Some(item) => EditOutcome::Updated(item),
                None => EditOutcome::NotFound,
            });
        }

        Ok(match self.ledger.update(id, patch).await? {
            Some(item) => {
                tracing::info!("Gallery item updated");
                EditOutcome::Updated(item)
            }
            None => EditOutcome::NotFound,
        })
    }

    pub async fn list_active(&self, kind: Option<MediaKind>) -> Result<Vec<GalleryItem>, LedgerError> {
        self.ledger.list_active(kind).await
    }

    pub async fn quota_status(&self, kind: MediaKind) -> Result<QuotaDecision, LedgerError> {
        self.pipeline.quota_gate().admit(kind).await
    }

    /// Reconciler over the same storage and ledger.
    pub fn reconciler(&self) -> OrphanReconciler {
        OrphanReconciler::new(self.storage.clone(), self.ledger.clone(), self.reconcile)
    }

    pub fn pipeline(&self) -> &IngestionPipeline {
        &self.pipeline
    }
}
