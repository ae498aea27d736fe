//! Retiring gallery items.
//!
//! The ledger soft-delete is authoritative. Physical deletion of the stored
//! objects happens afterwards and never fails the retire; anything left
//! behind is picked up by the reconciler.

use futures::stream::{self, StreamExt};
use galleria_core::GalleryItem;
use galleria_db::GalleryLedger;
use galleria_storage::{key_from_ref, Storage};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::RetireError;

const DELETE_CONCURRENCY: usize = 4;

/// An object that could not be removed during cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    pub key: String,
    pub reason: String,
}

/// What happened to the stored objects of a retired item.
#[derive(Debug, Clone)]
pub struct RetireReport {
    pub item: GalleryItem,
    pub deleted_keys: Vec<String>,
    pub failed: Vec<CleanupFailure>,
    /// References that did not resolve to a storage key.
    pub unresolved_refs: Vec<String>,
}

impl RetireReport {
    pub fn fully_cleaned(&self) -> bool {
        self.failed.is_empty() && self.unresolved_refs.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum RetireOutcome {
    Retired(RetireReport),
    NotFound,
}

impl RetireOutcome {
    pub fn is_retired(&self) -> bool {
        matches!(self, RetireOutcome::Retired(_))
    }
}

/// Soft-deletes items and cleans up their objects.
#[derive(Clone)]
pub struct RetentionManager {
    storage: Arc<dyn Storage>,
    ledger: Arc<dyn GalleryLedger>,
}

impl RetentionManager {
    pub fn new(storage: Arc<dyn Storage>, ledger: Arc<dyn GalleryLedger>) -> Self {
        Self { storage, ledger }
    }

    #[tracing::instrument(skip(self), fields(item_id = %id))]
    pub async fn retire(&self, id: Uuid) -> Result<RetireOutcome, RetireError> {
        if self.ledger.get_active(id).await?.is_none() {
            tracing::debug!("Item not found or already retired");
            return Ok(RetireOutcome::NotFound);
        }

        // A concurrent retire may have won between the lookup and here.
        let Some(item) = self.ledger.soft_delete(id).await? else {
            tracing::debug!("Item retired concurrently");
            return Ok(RetireOutcome::NotFound);
        };

        tracing::info!(media_kind = %item.media_kind, "Gallery item retired");

        let report = self.cleanup(item).await;
        if !report.fully_cleaned() {
            tracing::warn!(
                failed = report.failed.len(),
                unresolved = report.unresolved_refs.len(),
                "Object cleanup incomplete; leftovers will be reconciled"
            );
        }

        Ok(RetireOutcome::Retired(report))
    }

    /// Delete every object the item references, once each. Best-effort.
    async fn cleanup(&self, item: GalleryItem) -> RetireReport {
        let mut keys: Vec<String> = Vec::new();
        let mut unresolved_refs = Vec::new();

        for reference in item.object_refs() {
            match key_from_ref(reference) {
                Some(key) if !keys.contains(&key) => keys.push(key),
                Some(_) => {}
                None => {
                    tracing::warn!(object_ref = %reference, "Object reference has no storage key");
                    unresolved_refs.push(reference.to_string());
                }
            }
        }

        let results: Vec<(String, Result<(), String>)> = stream::iter(keys)
            .map(|key| {
                let storage = self.storage.clone();
                async move {
                    let result = storage.delete(&key).await.map_err(|e| e.to_string());
                    (key, result)
                }
            })
            .buffer_unordered(DELETE_CONCURRENCY)
            .collect()
            .await;

        let mut deleted_keys = Vec::new();
        let mut failed = Vec::new();
        for (key, result) in results {
            match result {
                Ok(()) => {
                    tracing::debug!(storage_key = %key, "Deleted object");
                    deleted_keys.push(key);
                }
                Err(reason) => {
                    tracing::error!(
                        error = %reason,
                        storage_key = %key,
                        "Failed to delete object from storage"
                    );
                    failed.push(CleanupFailure { key, reason });
                }
            }
        }

        RetireReport {
            item,
            deleted_keys,
            failed,
            unresolved_refs,
        }
    }
}
