//! Ingestion pipeline: gate → read → validate → compress → upload → record.

mod pipeline;
mod progress;
mod types;

pub use pipeline::IngestionPipeline;
pub use progress::{IngestStage, NoProgress, ProgressSink};
pub use types::{IngestRequest, IngestSource};
