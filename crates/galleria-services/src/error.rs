//! Typed failures of the gallery operations.

use galleria_core::{ErrorMetadata, LogLevel, MediaKind};
use galleria_db::LedgerError;
use galleria_processing::ValidationError;
use galleria_storage::StorageError;
use thiserror::Error;

/// Why an ingest did not produce a gallery item.
///
/// No variant leaves a ledger row behind.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Storage bucket {0} does not exist")]
    StorageNotConfigured(String),

    #[error("Quota exceeded: {current}/{limit} active items")]
    QuotaExceeded { current: i64, limit: i64 },

    #[error("Uploads of {0} items are disabled")]
    KindDisabled(MediaKind),

    #[error("Invalid media: {0}")]
    InvalidMedia(#[from] ValidationError),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Image compression failed: {0}")]
    CompressionFailed(String),

    #[error("Source could not be read: {0}")]
    SourceUnreadable(#[source] std::io::Error),

    #[error("Quota check failed: {0}")]
    QuotaCheckFailed(#[source] LedgerError),

    #[error("Upload failed: {0}")]
    UploadFailed(#[source] StorageError),

    #[error("Ledger write failed: {0}")]
    LedgerWriteFailed(#[source] LedgerError),
}

fn ingest_error_static_metadata(
    err: &IngestError,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        IngestError::StorageNotConfigured(_) => (
            "STORAGE_NOT_CONFIGURED",
            false,
            Some("Create the bucket or fix the storage configuration"),
            LogLevel::Error,
        ),
        IngestError::QuotaExceeded { .. } => (
            "QUOTA_EXCEEDED",
            false,
            Some("Remove an existing item before adding another"),
            LogLevel::Warn,
        ),
        IngestError::KindDisabled(_) => (
            "KIND_DISABLED",
            false,
            Some("Enable this media kind in the gallery configuration"),
            LogLevel::Debug,
        ),
        IngestError::InvalidMedia(_) => (
            "INVALID_MEDIA",
            false,
            Some("Check the file type and size"),
            LogLevel::Debug,
        ),
        IngestError::InvalidMetadata(_) => (
            "INVALID_METADATA",
            false,
            Some("Shorten the title"),
            LogLevel::Debug,
        ),
        IngestError::CompressionFailed(_) => (
            "COMPRESSION_FAILED",
            false,
            Some("Check image format and try a different file"),
            LogLevel::Warn,
        ),
        IngestError::SourceUnreadable(_) => (
            "SOURCE_UNREADABLE",
            false,
            Some("Check that the file exists and is readable"),
            LogLevel::Warn,
        ),
        IngestError::QuotaCheckFailed(_) => (
            "LEDGER_UNAVAILABLE",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
        IngestError::UploadFailed(_) => (
            "UPLOAD_FAILED",
            true,
            Some("Retry the upload"),
            LogLevel::Error,
        ),
        IngestError::LedgerWriteFailed(_) => (
            "LEDGER_WRITE_FAILED",
            true,
            Some("Retry the upload; the stored object will be reconciled"),
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for IngestError {
    fn error_code(&self) -> &'static str {
        ingest_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        ingest_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        ingest_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        ingest_error_static_metadata(self).3
    }
}

/// Ledger failure while retiring an item.
#[derive(Debug, Error)]
pub enum RetireError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl ErrorMetadata for RetireError {
    fn error_code(&self) -> &'static str {
        "LEDGER_ERROR"
    }

    fn is_recoverable(&self) -> bool {
        true
    }

    fn suggested_action(&self) -> Option<&'static str> {
        Some("Retry after a short delay")
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::Error
    }
}

/// Failure while editing an item.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("Invalid edit: {0}")]
    InvalidPatch(String),

    #[error("Ledger error: {0}")]
    Ledger(#[source] LedgerError),
}

impl From<LedgerError> for EditError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidRecord(reason) => EditError::InvalidPatch(reason),
            other => EditError::Ledger(other),
        }
    }
}

impl ErrorMetadata for EditError {
    fn error_code(&self) -> &'static str {
        match self {
            EditError::InvalidPatch(_) => "INVALID_EDIT",
            EditError::Ledger(_) => "LEDGER_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, EditError::Ledger(_))
    }

    fn suggested_action(&self) -> Option<&'static str> {
        match self {
            EditError::InvalidPatch(_) => Some("Shorten the title"),
            EditError::Ledger(_) => Some("Retry after a short delay"),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            EditError::InvalidPatch(_) => LogLevel::Debug,
            EditError::Ledger(_) => LogLevel::Error,
        }
    }
}

/// Failure of a reconciliation sweep as a whole.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Listing storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Reading ledger references failed: {0}")]
    Ledger(#[from] LedgerError),
}

impl ErrorMetadata for ReconcileError {
    fn error_code(&self) -> &'static str {
        match self {
            ReconcileError::Storage(_) => "STORAGE_ERROR",
            ReconcileError::Ledger(_) => "LEDGER_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        true
    }

    fn suggested_action(&self) -> Option<&'static str> {
        Some("The next sweep will retry")
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_exceeded_is_user_facing() {
        let err = IngestError::QuotaExceeded {
            current: 20,
            limit: 20,
        };
        assert_eq!(err.error_code(), "QUOTA_EXCEEDED");
        assert!(!err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Warn);
        assert_eq!(err.to_string(), "Quota exceeded: 20/20 active items");
    }

    #[test]
    fn upload_failures_are_retry_safe() {
        let err = IngestError::UploadFailed(StorageError::UploadFailed("timeout".into()));
        assert!(err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn validation_errors_convert() {
        let err: IngestError = ValidationError::EmptyFile.into();
        assert_eq!(err.error_code(), "INVALID_MEDIA");
    }

    #[test]
    fn invalid_ledger_records_become_invalid_edits() {
        let err: EditError = LedgerError::InvalidRecord("title".into()).into();
        assert!(matches!(err, EditError::InvalidPatch(_)));
        assert!(!err.is_recoverable());
    }
}
