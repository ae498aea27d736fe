use chrono::{Duration as ChronoDuration, Utc};
use galleria_core::constants::GALLERY_PREFIX;
use galleria_core::GalleryConfig;
use galleria_db::GalleryLedger;
use galleria_storage::{key_from_ref, Storage};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::error::ReconcileError;

/// Floor for the loop period; `tokio::time::interval` rejects zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Objects younger than this are never touched; an ingest may still be
    /// about to record them.
    pub grace_period: Duration,
    pub interval: Duration,
    /// Report orphans without deleting them.
    pub dry_run: bool,
}

impl ReconcileConfig {
    pub fn from_config(config: &GalleryConfig) -> Self {
        Self {
            grace_period: Duration::from_secs(config.reconcile_grace_period_secs),
            interval: Duration::from_secs(config.reconcile_interval_secs),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub scanned: usize,
    pub referenced: usize,
    pub too_recent: usize,
    /// Orphans found (and deleted, unless dry run).
    pub orphans: Vec<String>,
    pub failed: Vec<String>,
}

/// Periodic sweep deleting unreferenced objects under the gallery prefix.
#[derive(Clone)]
pub struct OrphanReconciler {
    storage: Arc<dyn Storage>,
    ledger: Arc<dyn GalleryLedger>,
    config: ReconcileConfig,
}

impl OrphanReconciler {
    pub fn new(
        storage: Arc<dyn Storage>,
        ledger: Arc<dyn GalleryLedger>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            storage,
            ledger,
            config,
        }
    }

    /// Start the background sweep loop
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.config.interval.max(MIN_SWEEP_INTERVAL);
            let mut sweep_interval = interval(period);

            loop {
                sweep_interval.tick().await;

                tracing::info!("Starting scheduled orphan reconciliation");

                match self.sweep().await {
                    Ok(report) => tracing::info!(
                        scanned = report.scanned,
                        orphans = report.orphans.len(),
                        failed = report.failed.len(),
                        "Orphan reconciliation completed"
                    ),
                    Err(e) => tracing::error!(error = %e, "Orphan reconciliation failed"),
                }
            }
        })
    }

    /// One pass over the gallery prefix.
    ///
    /// The ledger references are read after the listing, so an object whose
    /// row is written during the sweep is seen as referenced.
    #[tracing::instrument(skip(self), fields(reconcile.dry_run = self.config.dry_run))]
    pub async fn sweep(&self) -> Result<ReconcileReport, ReconcileError> {
        let objects = self.storage.list(GALLERY_PREFIX).await?;
        let referenced: HashSet<String> = self
            .ledger
            .active_object_refs()
            .await?
            .iter()
            .filter_map(|reference| key_from_ref(reference))
            .collect();

        let grace = ChronoDuration::from_std(self.config.grace_period)
            .unwrap_or(ChronoDuration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(grace)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);

        let mut report = ReconcileReport {
            scanned: objects.len(),
            ..Default::default()
        };

        for object in objects {
            if referenced.contains(&object.key) {
                report.referenced += 1;
                continue;
            }
            if object.last_modified > cutoff {
                report.too_recent += 1;
                continue;
            }

            if self.config.dry_run {
                tracing::info!(
                    storage_key = %object.key,
                    size_bytes = object.size,
                    "Orphan found"
                );
                report.orphans.push(object.key);
                continue;
            }

            match self.storage.delete(&object.key).await {
                Ok(()) => {
                    tracing::info!(
                        storage_key = %object.key,
                        size_bytes = object.size,
                        "Deleted orphaned object"
                    );
                    report.orphans.push(object.key);
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        storage_key = %object.key,
                        "Failed to delete orphaned object"
                    );
                    report.failed.push(object.key);
                }
            }
        }

        Ok(report)
    }
}
