use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_channel::{Receiver, Sender, TrySendError};
use locate_fee_pricing::domain::AuditRecord;

/// The append-only audit sink lives outside this service (§1: "an
/// append-only audit sink" is a named external collaborator). This trait
/// is the boundary it plugs into; the default implementation used outside
/// tests logs at `info` so the record isn't silently lost in a dev
/// deployment with no sink wired up.
#[async_trait::async_trait]
pub(crate) trait AuditSink: Send + Sync {
    async fn write(&self, record: AuditRecord) -> anyhow::Result<()>;
}

pub(crate) struct LoggingAuditSink;

#[async_trait::async_trait]
impl AuditSink for LoggingAuditSink {
    async fn write(&self, record: AuditRecord) -> anyhow::Result<()> {
        tracing::info!(
            fingerprint = %record.fingerprint,
            client_id = %record.client_id,
            ticker = %record.ticker,
            total_fee = %record.result.total_fee,
            "audit record"
        );
        Ok(())
    }
}

/// Fire-and-forget emission into a bounded queue (§5, §9): overflow drops
/// the oldest entry and increments a counter rather than blocking the
/// calculation path.
pub(crate) struct AuditQueue {
    sender: Sender<AuditRecord>,
    receiver: Receiver<AuditRecord>,
    dropped: AtomicU64,
}

impl AuditQueue {
    pub(crate) fn new(capacity: usize) -> Arc<Self> {
        let (sender, receiver) = async_channel::bounded(capacity);
        Arc::new(Self {
            sender,
            receiver,
            dropped: AtomicU64::new(0),
        })
    }

    /// Never blocks and never fails the request. If the queue is full, the
    /// oldest pending record is dropped to make room and the drop counter
    /// is incremented.
    pub(crate) fn emit(&self, record: AuditRecord) {
        match self.sender.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                let _ = self.receiver.try_recv();
                self.dropped.fetch_add(1, Ordering::Relaxed);
                if self.sender.try_send(record).is_err() {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    pub(crate) fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Runs until the queue is closed, writing every record to `sink`.
    /// Sink failures raise an internal metric (logged here) and never
    /// propagate back to a calculation request, which has long since
    /// returned.
    pub(crate) async fn run_worker(self: Arc<Self>, sink: Arc<dyn AuditSink>) {
        while let Ok(record) = self.receiver.recv().await {
            if let Err(e) = sink.write(record).await {
                tracing::error!(error = %e, "audit sink write failed");
            }
        }
    }

    pub(crate) fn close(&self) {
        self.sender.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::Utc;
    use locate_fee_pricing::domain::{CalculationResult, FeeBreakdown};
    use locate_fee_pricing::number::Money;
    use std::str::FromStr;

    fn sample_record(fingerprint: &str) -> AuditRecord {
        AuditRecord {
            fingerprint: fingerprint.to_string(),
            correlation_id: "corr".to_string(),
            client_id: "client-1".to_string(),
            ticker: "AAPL".to_string(),
            position_value: BigDecimal::from_str("100000").unwrap(),
            loan_days: 30,
            result: CalculationResult {
                fingerprint: fingerprint.to_string(),
                total_fee: Money::zero(),
                breakdown: FeeBreakdown {
                    borrow_cost: Money::zero(),
                    markup: Money::zero(),
                    transaction_fees: Money::zero(),
                },
                borrow_rate_used: locate_fee_pricing::number::Rate::zero(),
                timestamp: Utc::now(),
            },
            provenance: Default::default(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn overflow_drops_oldest_and_counts() {
        let queue = AuditQueue::new(2);
        queue.emit(sample_record("a"));
        queue.emit(sample_record("b"));
        queue.emit(sample_record("c"));
        assert_eq!(queue.dropped_count(), 1);
        assert_eq!(queue.receiver.recv().await.unwrap().fingerprint, "b");
        assert_eq!(queue.receiver.recv().await.unwrap().fingerprint, "c");
    }
}
