//! Decision event bus
//!
//! Connects the decision service (producer) to the in-memory decision log
//! and to background consumers through a `tokio::broadcast` channel.

use super::log::DecisionLog;
use aigov_decision::{DecisionRecord, DecisionSink, DecisionStatus};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Broadcast-based decision bus.
///
/// The shared log is the source of truth; subscribers that fall behind see
/// `RecvError::Lagged` and skip ahead.
pub struct AuditEventBus {
    tx: broadcast::Sender<DecisionRecord>,
    log: Arc<RwLock<DecisionLog>>,
}

impl AuditEventBus {
    /// `capacity` is the broadcast channel buffer size
    pub fn new(capacity: usize, log: Arc<RwLock<DecisionLog>>) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx, log }
    }

    /// Append to the log, then broadcast. Broadcast failures (no receivers)
    /// are ignored.
    pub fn publish(&self, record: DecisionRecord) {
        self.log
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .record(record.clone());
        let _ = self.tx.send(record);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DecisionRecord> {
        self.tx.subscribe()
    }

    pub fn log(&self) -> &Arc<RwLock<DecisionLog>> {
        &self.log
    }

    /// Spawn a background task that reports every DENY at `warn`
    pub fn spawn_violation_logger(&self) -> tokio::task::JoinHandle<()> {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(record) if record.decision.status == DecisionStatus::Deny => {
                        tracing::warn!(
                            decision_id = %record.decision_id,
                            user = %record.user_email,
                            service = %record.service_id,
                            rule = %record.decision.matched_rule,
                            risk_score = record.decision.risk_score,
                            "Policy violation: {}",
                            record.decision.reason
                        );
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Violation logger lagged, skipped decisions");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::info!("Violation logger stopped");
        })
    }
}

impl DecisionSink for AuditEventBus {
    fn record(&self, record: &DecisionRecord) {
        self.publish(record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::log::tests::make_record;

    fn make_bus() -> (AuditEventBus, Arc<RwLock<DecisionLog>>) {
        let log = Arc::new(RwLock::new(DecisionLog::new(100)));
        (AuditEventBus::new(16, log.clone()), log)
    }

    #[tokio::test]
    async fn test_publish_records_to_log() {
        let (bus, log) = make_bus();
        bus.publish(make_record("a@corp.io", "https://chatgpt.com"));

        let l = log.read().unwrap();
        assert_eq!(l.len(), 1);
        assert_eq!(l.total_count(), 1);
    }

    #[tokio::test]
    async fn test_sink_impl_records() {
        let (bus, log) = make_bus();
        let sink: &dyn DecisionSink = &bus;
        sink.record(&make_record("a@corp.io", "https://character.ai"));
        assert_eq!(log.read().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_receive_records() {
        let (bus, _log) = make_bus();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let record = make_record("a@corp.io", "https://character.ai");
        bus.publish(record.clone());

        assert_eq!(rx1.recv().await.unwrap().decision_id, record.decision_id);
        assert_eq!(rx2.recv().await.unwrap().decision_id, record.decision_id);
    }

    #[tokio::test]
    async fn test_violation_logger_stops_when_bus_dropped() {
        let (bus, _log) = make_bus();
        let handle = bus.spawn_violation_logger();
        tokio::task::yield_now().await;

        bus.publish(make_record("a@corp.io", "https://character.ai"));
        drop(bus);

        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
