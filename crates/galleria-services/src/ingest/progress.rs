/// Receives `(percent, label)` at each ingest milestone.
///
/// Called synchronously from the pipeline; implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8, label: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(u8, &str) + Send + Sync,
{
    fn report(&self, percent: u8, label: &str) {
        self(percent, label)
    }
}

/// Sink that discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _percent: u8, _label: &str) {}
}

/// Milestones of a single ingest, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    CheckingStorage,
    Compressing,
    Compressed,
    BufferReady,
    Uploading,
    Finalizing,
    Complete,
}

impl IngestStage {
    pub fn percent(self) -> u8 {
        match self {
            IngestStage::CheckingStorage => 0,
            IngestStage::Compressing => 10,
            IngestStage::Compressed => 30,
            IngestStage::BufferReady => 50,
            IngestStage::Uploading => 60,
            IngestStage::Finalizing => 90,
            IngestStage::Complete => 100,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IngestStage::CheckingStorage => "checking storage",
            IngestStage::Compressing => "compressing",
            IngestStage::Compressed | IngestStage::BufferReady => "preparing upload",
            IngestStage::Uploading => "uploading",
            IngestStage::Finalizing => "finalizing",
            IngestStage::Complete => "complete",
        }
    }

    pub(crate) fn report(self, sink: &dyn ProgressSink) {
        sink.report(self.percent(), self.label());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn closures_are_sinks() {
        let seen = Mutex::new(Vec::new());
        let sink = |percent: u8, label: &str| seen.lock().unwrap().push((percent, label.to_string()));

        IngestStage::Uploading.report(&sink);
        IngestStage::Complete.report(&sink);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(60, "uploading".to_string()), (100, "complete".to_string())]
        );
    }

    #[test]
    fn percentages_increase() {
        let stages = [
            IngestStage::CheckingStorage,
            IngestStage::Compressing,
            IngestStage::Compressed,
            IngestStage::BufferReady,
            IngestStage::Uploading,
            IngestStage::Finalizing,
            IngestStage::Complete,
        ];
        assert!(stages.windows(2).all(|w| w[0].percent() < w[1].percent()));
    }
}
