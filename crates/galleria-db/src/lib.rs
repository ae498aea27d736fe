//! Galleria Database Library
//!
//! The gallery ledger: the single source of truth for which items are
//! active. Storage objects only become visible once a ledger row exists.

pub mod db;
pub mod error;
pub mod ledger;

pub use db::{connect, run_migrations, MemoryLedger, PostgresGalleryLedger};
pub use error::{LedgerError, LedgerResult};
pub use ledger::GalleryLedger;
