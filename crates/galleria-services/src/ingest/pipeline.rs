//! Ingestion pipeline.
//!
//! Steps run strictly in order and any failure aborts the ingest. The ledger
//! row is written last, so an item is never visible unless its object is
//! stored. An object stored without a row is an orphan left for the
//! reconciler, except when the ledger refuses the row on quota, in which case
//! the freshly stored objects are deleted once, best-effort.

use bytes::Bytes;
use galleria_core::constants::VIDEO_SOFT_LIMIT_BYTES;
use galleria_core::models::validate_title;
use galleria_core::{GalleryConfig, GalleryItem, MediaKind, NewGalleryItem};
use galleria_db::{GalleryLedger, LedgerError};
use galleria_processing::{
    extension_for_content_type, infer_content_type, CompressionEnvelope, CompressionError,
    MediaValidator, SizeEnvelopeCompressor, ValidationError,
};
use galleria_storage::{ObjectKeyAllocator, Storage};
use std::sync::Arc;

use super::progress::{IngestStage, ProgressSink};
use super::types::{IngestRequest, IngestSource};
use crate::error::IngestError;
use crate::quota::{QuotaDecision, QuotaGate};

/// A stored object: its key and the public reference recorded in the ledger.
struct StoredRef {
    key: String,
    url: String,
}

/// Runs a single upload from raw source to ledger row.
#[derive(Clone)]
pub struct IngestionPipeline {
    storage: Arc<dyn Storage>,
    ledger: Arc<dyn GalleryLedger>,
    quota: QuotaGate,
    keys: ObjectKeyAllocator,
    compressor: SizeEnvelopeCompressor,
    thumbnail_compressor: SizeEnvelopeCompressor,
    image_validator: MediaValidator,
    video_validator: MediaValidator,
}

impl IngestionPipeline {
    pub fn new(
        storage: Arc<dyn Storage>,
        ledger: Arc<dyn GalleryLedger>,
        config: &GalleryConfig,
    ) -> Self {
        Self {
            quota: QuotaGate::new(ledger.clone()),
            storage,
            ledger,
            keys: ObjectKeyAllocator::new(),
            compressor: SizeEnvelopeCompressor::new(CompressionEnvelope::gallery_image()),
            thumbnail_compressor: SizeEnvelopeCompressor::new(
                CompressionEnvelope::video_thumbnail(),
            ),
            image_validator: MediaValidator::for_kind(config, MediaKind::Image),
            video_validator: MediaValidator::for_kind(config, MediaKind::Video),
        }
    }

    pub fn quota_gate(&self) -> &QuotaGate {
        &self.quota
    }

    fn validator(&self, kind: MediaKind) -> &MediaValidator {
        match kind {
            MediaKind::Image => &self.image_validator,
            MediaKind::Video => &self.video_validator,
        }
    }

    #[tracing::instrument(skip(self, request, progress), fields(media_kind = %request.kind))]
    pub async fn ingest(
        &self,
        request: IngestRequest,
        progress: &dyn ProgressSink,
    ) -> Result<GalleryItem, IngestError> {
        let start = std::time::Instant::now();
        let kind = request.kind;

        IngestStage::CheckingStorage.report(progress);
        let bucket_exists = self
            .storage
            .bucket_exists()
            .await
            .map_err(IngestError::UploadFailed)?;
        if !bucket_exists {
            tracing::error!(bucket = %self.storage.bucket(), "Gallery bucket is missing");
            return Err(IngestError::StorageNotConfigured(
                self.storage.bucket().to_string(),
            ));
        }

        match self
            .quota
            .admit(kind)
            .await
            .map_err(IngestError::QuotaCheckFailed)?
        {
            QuotaDecision::Allowed { .. } => {}
            QuotaDecision::Rejected { current, limit } => {
                tracing::info!(current, limit, "Upload rejected: quota reached");
                return Err(IngestError::QuotaExceeded { current, limit });
            }
        }

        if let Some(title) = request.title.as_deref() {
            validate_title(title.trim())
                .map_err(|e| IngestError::InvalidMetadata(e.to_string()))?;
        }

        let data = read_source(&request.source).await?;
        let content_type = request
            .content_type
            .clone()
            .or_else(|| infer_content_type(kind, &data, request.filename.as_deref()))
            .ok_or(IngestError::InvalidMedia(ValidationError::UnknownContentType))?;
        self.validator(kind).validate(&data, &content_type)?;

        let (payload, content_type) = match kind {
            MediaKind::Image => {
                IngestStage::Compressing.report(progress);
                let compressed = self
                    .compressor
                    .compress(data)
                    .await
                    .map_err(|e| match e {
                        CompressionError::Decode(reason) | CompressionError::TaskFailed(reason) => {
                            IngestError::CompressionFailed(reason)
                        }
                    })?;
                IngestStage::Compressed.report(progress);
                (compressed.bytes, compressed.content_type.to_string())
            }
            MediaKind::Video => {
                if data.len() > VIDEO_SOFT_LIMIT_BYTES {
                    tracing::warn!(
                        size_bytes = data.len(),
                        soft_limit_bytes = VIDEO_SOFT_LIMIT_BYTES,
                        "Video exceeds soft size limit; uploading anyway"
                    );
                }
                (data, content_type)
            }
        };

        IngestStage::BufferReady.report(progress);
        let key = self
            .keys
            .allocate(kind, extension_for_content_type(&content_type));

        IngestStage::Uploading.report(progress);
        let primary = self.store(key, payload, &content_type).await?;

        let thumbnail = match (kind, request.thumbnail) {
            (MediaKind::Video, Some(thumbnail)) => self.store_thumbnail(thumbnail).await,
            _ => None,
        };

        IngestStage::Finalizing.report(progress);
        let item = NewGalleryItem::new(kind, primary.url.clone())
            .with_title(request.title)
            .with_uploader(request.uploaded_by)
            .with_thumbnail(thumbnail.as_ref().map(|t| t.url.clone()));

        let created = match self.ledger.insert(item, kind.quota()).await {
            Ok(created) => created,
            Err(LedgerError::QuotaExceeded { current, limit, .. }) => {
                tracing::warn!(
                    current,
                    limit,
                    key = %primary.key,
                    "Quota race lost; removing uploaded objects"
                );
                let mut keys = vec![primary.key];
                keys.extend(thumbnail.map(|t| t.key));
                self.discard(&keys).await;
                return Err(IngestError::QuotaExceeded { current, limit });
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    key = %primary.key,
                    "Ledger write failed; stored object is orphaned until reconciled"
                );
                return Err(IngestError::LedgerWriteFailed(e));
            }
        };

        IngestStage::Complete.report(progress);
        tracing::info!(
            item_id = %created.id,
            key = %primary.key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Gallery item ingested"
        );

        Ok(created)
    }

    /// Create-only upload followed by public URL resolution.
    async fn store(
        &self,
        key: String,
        payload: Bytes,
        content_type: &str,
    ) -> Result<StoredRef, IngestError> {
        self.storage
            .put(&key, payload, content_type)
            .await
            .map_err(IngestError::UploadFailed)?;
        let url = self
            .storage
            .public_url(&key)
            .await
            .map_err(IngestError::UploadFailed)?;
        Ok(StoredRef { key, url })
    }

    /// Compress and upload a video thumbnail. Never fails the ingest.
    async fn store_thumbnail(&self, source: Bytes) -> Option<StoredRef> {
        let compressed = match self.thumbnail_compressor.compress(source).await {
            Ok(compressed) => compressed,
            Err(e) => {
                tracing::warn!(error = %e, "Thumbnail could not be compressed; continuing without it");
                return None;
            }
        };

        let key = self.keys.allocate_thumbnail();
        if let Err(e) = self
            .storage
            .put(&key, compressed.bytes, compressed.content_type)
            .await
        {
            tracing::warn!(error = %e, key = %key, "Thumbnail upload failed; continuing without it");
            return None;
        }

        match self.storage.public_url(&key).await {
            Ok(url) => Some(StoredRef { key, url }),
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Thumbnail URL unavailable; continuing without it");
                self.discard(std::slice::from_ref(&key)).await;
                None
            }
        }
    }

    /// One best-effort delete per key.
    async fn discard(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.storage.delete(key).await {
                tracing::warn!(error = %e, key = %key, "Failed to remove uploaded object");
            }
        }
    }
}

async fn read_source(source: &IngestSource) -> Result<Bytes, IngestError> {
    match source {
        IngestSource::Bytes(data) => Ok(data.clone()),
        IngestSource::File(path) => tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(IngestError::SourceUnreadable),
    }
}
