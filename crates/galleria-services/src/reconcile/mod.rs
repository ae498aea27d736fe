//! Removal of stored objects that no active item references.

mod service;

pub use service::{OrphanReconciler, ReconcileConfig, ReconcileReport};
