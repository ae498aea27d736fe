use galleria_core::MediaKind;
use thiserror::Error;

/// Ledger operation errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The ledger refused the row because the kind is at its ceiling.
    #[error("Quota exceeded for {kind}: {current}/{limit} active items")]
    QuotaExceeded {
        kind: MediaKind,
        current: i64,
        limit: i64,
    },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

impl From<validator::ValidationErrors> for LedgerError {
    fn from(errors: validator::ValidationErrors) -> Self {
        LedgerError::InvalidRecord(errors.to_string())
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
