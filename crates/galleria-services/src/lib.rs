//! Galleria Services Layer
//!
//! Orchestration on top of storage, ledger and processing: the ingestion
//! pipeline, quota gate, retention manager, orphan reconciler and the
//! [`GalleryService`] facade that callers use.

pub mod error;
pub mod gallery;
pub mod ingest;
pub mod quota;
pub mod reconcile;
pub mod retention;

pub use error::{EditError, IngestError, ReconcileError, RetireError};
pub use gallery::{EditOutcome, GalleryService};
pub use ingest::{
    IngestRequest, IngestSource, IngestStage, IngestionPipeline, NoProgress, ProgressSink,
};
pub use quota::{QuotaDecision, QuotaGate};
pub use reconcile::{OrphanReconciler, ReconcileConfig, ReconcileReport};
pub use retention::{CleanupFailure, RetentionManager, RetireOutcome, RetireReport};

pub use galleria_db::{GalleryLedger, LedgerError, MemoryLedger, PostgresGalleryLedger};
pub use galleria_storage::{create_storage, Storage, StorageError};
