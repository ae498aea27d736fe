//! Per-kind capacity check run before any expensive ingest work.

use galleria_core::MediaKind;
use galleria_db::{GalleryLedger, LedgerResult};
use std::sync::Arc;

/// Result of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed { current: i64, limit: i64 },
    Rejected { current: i64, limit: i64 },
}

impl QuotaDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, QuotaDecision::Allowed { .. })
    }

    pub fn current(&self) -> i64 {
        match *self {
            QuotaDecision::Allowed { current, .. } | QuotaDecision::Rejected { current, .. } => {
                current
            }
        }
    }

    pub fn limit(&self) -> i64 {
        match *self {
            QuotaDecision::Allowed { limit, .. } | QuotaDecision::Rejected { limit, .. } => limit,
        }
    }

    /// Free slots left (zero when full).
    pub fn remaining(&self) -> i64 {
        (self.limit() - self.current()).max(0)
    }
}

/// Advisory quota check against the ledger.
///
/// The ceiling is enforced again, atomically, when the ledger inserts the row.
#[derive(Clone)]
pub struct QuotaGate {
    ledger: Arc<dyn GalleryLedger>,
}

impl QuotaGate {
    pub fn new(ledger: Arc<dyn GalleryLedger>) -> Self {
        Self { ledger }
    }

    #[tracing::instrument(skip(self), fields(media_kind = %kind))]
    pub async fn admit(&self, kind: MediaKind) -> LedgerResult<QuotaDecision> {
        let current = self.ledger.count_active(kind).await?;
        let limit = kind.quota();

        let decision = if current < limit {
            QuotaDecision::Allowed { current, limit }
        } else {
            QuotaDecision::Rejected { current, limit }
        };

        tracing::debug!(current, limit, allowed = decision.is_allowed(), "Quota checked");
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galleria_core::NewGalleryItem;
    use galleria_db::MemoryLedger;

    #[tokio::test]
    async fn admits_until_the_ceiling() {
        let ledger = Arc::new(MemoryLedger::new());
        let gate = QuotaGate::new(ledger.clone());

        assert_eq!(
            gate.admit(MediaKind::Video).await.unwrap(),
            QuotaDecision::Allowed {
                current: 0,
                limit: 10
            }
        );

        for n in 0..10 {
            let item = NewGalleryItem::new(MediaKind::Video, format!("http://x/gallery/videos/{n}.mp4"));
            ledger.insert(item, 10).await.unwrap();
        }

        let decision = gate.admit(MediaKind::Video).await.unwrap();
        assert_eq!(
            decision,
            QuotaDecision::Rejected {
                current: 10,
                limit: 10
            }
        );
        assert_eq!(decision.remaining(), 0);
        assert!(gate.admit(MediaKind::Image).await.unwrap().is_allowed());
    }
}
