//! Error metadata shared by the pipeline's typed errors.
//!
//! Every crate defines its own `thiserror` enum; the types surfaced to the
//! caller implement [`ErrorMetadata`] so that the caller can decide how to
//! present, log and retry them without matching on every variant.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like a full quota
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Describes how an error should be presented to the caller.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "QUOTA_EXCEEDED")
    fn error_code(&self) -> &'static str;

    /// Whether re-running the same operation from scratch may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the caller
    fn suggested_action(&self) -> Option<&'static str>;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}
