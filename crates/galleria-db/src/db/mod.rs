//! Ledger backends and connection setup
//
// PostgreSQL ledger (production)
pub mod gallery;
//
// In-process ledger (tests, local tooling)
pub mod memory;
//
// Pool and migrations
pub mod pool;

pub use gallery::PostgresGalleryLedger;
pub use memory::MemoryLedger;
pub use pool::{connect, run_migrations};
