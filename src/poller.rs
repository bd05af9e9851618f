//! Poll cycle orchestrator
//!
//! A single repeating background task: fetch the current epoch and any new
//! proposals, ingest, compute which proposals just entered their start
//! epoch, and fan the batched notifications out to every subscriber.

use crate::batcher::batch;
use crate::config::PollConfig;
use crate::delivery::deliver;
use crate::registry::Proposal;
use crate::state::SharedState;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

/// Separator between notifications packed into one message
const NOTIFICATION_SEPARATOR: &str = "\n\n";

/// Periodic poll task
pub struct Poller {
    state: SharedState,
    period: Duration,
    startup_delay: Duration,
}

impl Poller {
    pub fn new(state: SharedState, config: &PollConfig) -> Self {
        Self {
            state,
            period: Duration::from_secs(config.interval_secs),
            startup_delay: Duration::from_secs(config.startup_delay_secs),
        }
    }

    /// Run forever. One cycle at a time: `Delay` pushes a tick back while a
    /// cycle is still in flight, so cycles never overlap.
    pub async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.startup_delay, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "Poll cycle started (every {:?}, first run in {:?})",
            self.period, self.startup_delay
        );
        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }

    /// One poll cycle. Transient source failures abort the cycle before any
    /// registry mutation; the next tick retries from the same cursor.
    pub async fn run_cycle(&self) {
        let state = &self.state;

        let current_epoch = match state.source.current_epoch().await {
            Ok(epoch) => epoch,
            Err(e) => {
                error!("Failed to get current epoch: {}", e);
                return;
            }
        };

        let cursor = state.registry.cursor().await;
        let fetched = match state.source.proposals_since(cursor).await {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to fetch proposals: {}", e);
                return;
            }
        };

        let mut proposals = Vec::with_capacity(fetched.len());
        for record in fetched {
            match record.validate() {
                Ok(proposal) => proposals.push(proposal),
                Err(e) => warn!("Skipping proposal record: {}", e),
            }
        }

        let ingested = state.registry.ingest(proposals).await;
        let newly_active = state.registry.newly_active(current_epoch).await;

        if !newly_active.is_empty() {
            self.notify(current_epoch, &newly_active).await;
        }

        if ingested > 0 || !newly_active.is_empty() {
            if let Err(e) = state.persist().await {
                error!("Failed to persist relay state: {}", e);
            }
        }
    }

    async fn notify(&self, current_epoch: u64, newly_active: &[Proposal]) {
        let state = &self.state;
        for proposal in newly_active {
            info!(
                "Sending notifications for proposal #{} (epoch {})",
                proposal.id, current_epoch
            );
        }

        let texts: Vec<String> = newly_active.iter().map(Proposal::notification_text).collect();
        let chunks = batch(&texts, state.max_message_len, NOTIFICATION_SEPARATOR);
        let recipients = state.subscribers.snapshot().await;
        let report = deliver(state.messenger.clone(), &recipients, &chunks).await;
        info!(
            sent = report.sent,
            failed = report.failed,
            recipients = recipients.len(),
            "Delivered activation notifications"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::test_support::MockMessenger;
    use crate::error::{source_error, RelayResult};
    use crate::persist::StateFile;
    use crate::source::{GovernanceSource, RawProposalRecord};
    use crate::state::AppState;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Scripted source: a fixed epoch and a queue of fetch results
    struct StubSource {
        epoch: Mutex<RelayResult<u64>>,
        batches: Mutex<Vec<RelayResult<Vec<RawProposalRecord>>>>,
        cursors_seen: Mutex<Vec<u64>>,
    }

    impl StubSource {
        fn new(epoch: u64) -> Self {
            Self {
                epoch: Mutex::new(Ok(epoch)),
                batches: Mutex::new(Vec::new()),
                cursors_seen: Mutex::new(Vec::new()),
            }
        }

        fn set_epoch(&self, epoch: u64) {
            *self.epoch.lock().unwrap() = Ok(epoch);
        }

        fn fail_epoch(&self) {
            *self.epoch.lock().unwrap() = Err(source_error("epoch endpoint down"));
        }

        fn push_batch(&self, records: Vec<serde_json::Value>) {
            let parsed = records
                .into_iter()
                .map(|v| serde_json::from_value(v).unwrap())
                .collect();
            self.batches.lock().unwrap().push(Ok(parsed));
        }

        fn push_failure(&self) {
            self.batches
                .lock()
                .unwrap()
                .push(Err(source_error("proposal endpoint down")));
        }
    }

    #[async_trait]
    impl GovernanceSource for StubSource {
        async fn current_epoch(&self) -> RelayResult<u64> {
            match &*self.epoch.lock().unwrap() {
                Ok(e) => Ok(*e),
                Err(_) => Err(source_error("epoch endpoint down")),
            }
        }

        async fn proposals_since(&self, since_id: u64) -> RelayResult<Vec<RawProposalRecord>> {
            self.cursors_seen.lock().unwrap().push(since_id);
            let mut batches = self.batches.lock().unwrap();
            if batches.is_empty() {
                return Ok(Vec::new());
            }
            batches.remove(0)
        }
    }

    fn record(id: u64, start: u64, end: u64) -> serde_json::Value {
        json!({
            "Proposal Id": id,
            "Start Epoch": start,
            "End Epoch": end,
            "Content": {"title": format!("Proposal {}", id)},
        })
    }

    struct Harness {
        poller: Poller,
        source: Arc<StubSource>,
        messenger: Arc<MockMessenger>,
        _dir: tempfile::TempDir,
    }

    async fn harness(epoch: u64, subscribers: &[i64]) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(StubSource::new(epoch));
        let messenger = Arc::new(MockMessenger::new());
        let state = Arc::new(AppState::new(
            source.clone(),
            messenger.clone(),
            StateFile::new(dir.path().join("state.json")),
            4090,
            None,
        ));
        for &chat in subscribers {
            state.subscribers.subscribe(chat).await;
        }
        Harness {
            poller: Poller::new(state, &PollConfig::default()),
            source,
            messenger,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_cycle_notifies_proposals_entering_their_start_epoch() {
        let h = harness(5, &[100, 200]).await;
        h.source
            .push_batch(vec![record(1, 5, 10), record(2, 7, 9)]);

        h.poller.run_cycle().await;

        // Only proposal 1 starts at epoch 5; both subscribers get one chunk
        let to_first = h.messenger.sent_to(100);
        assert_eq!(to_first.len(), 1);
        assert!(to_first[0].contains("#1"));
        assert!(!to_first[0].contains("#2"));
        assert_eq!(h.messenger.sent_to(200).len(), 1);
    }

    #[tokio::test]
    async fn test_no_send_when_nothing_newly_active() {
        let h = harness(4, &[100]).await;
        h.source.push_batch(vec![record(1, 5, 10)]);

        h.poller.run_cycle().await;

        assert!(h.messenger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_proposal_notified_once_across_cycles() {
        let h = harness(5, &[100]).await;
        h.source.push_batch(vec![record(1, 5, 10)]);

        h.poller.run_cycle().await;
        // Source returns the same record again on the next cycle
        h.source.push_batch(vec![record(1, 5, 10)]);
        h.poller.run_cycle().await;

        assert_eq!(h.messenger.sent_to(100).len(), 1);
    }

    #[tokio::test]
    async fn test_two_cycle_activation_scenario() {
        let h = harness(5, &[100]).await;
        h.source
            .push_batch(vec![record(1, 5, 10), record(2, 7, 9)]);

        h.poller.run_cycle().await;
        h.source.set_epoch(7);
        h.poller.run_cycle().await;

        let sent = h.messenger.sent_to(100);
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("#1"));
        assert!(sent[1].contains("#2"));
    }

    #[tokio::test]
    async fn test_epoch_failure_skips_cycle_without_fetch() {
        let h = harness(5, &[100]).await;
        h.source.fail_epoch();
        h.source.push_batch(vec![record(1, 5, 10)]);

        h.poller.run_cycle().await;

        assert!(h.source.cursors_seen.lock().unwrap().is_empty());
        assert!(h.messenger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_registry_unchanged() {
        let h = harness(5, &[100]).await;
        h.source.push_failure();
        h.poller.run_cycle().await;
        assert!(h.messenger.sent.lock().unwrap().is_empty());

        // Next cycle retries from the same (zero) cursor and succeeds
        h.source.push_batch(vec![record(1, 5, 10)]);
        h.poller.run_cycle().await;
        assert_eq!(*h.source.cursors_seen.lock().unwrap(), vec![0, 0]);
        assert_eq!(h.messenger.sent_to(100).len(), 1);
    }

    #[tokio::test]
    async fn test_cursor_advances_after_ingest() {
        let h = harness(99, &[]).await;
        h.source.push_batch(vec![record(3, 5, 10), record(8, 6, 9)]);
        h.poller.run_cycle().await;
        h.poller.run_cycle().await;

        assert_eq!(*h.source.cursors_seen.lock().unwrap(), vec![0, 8]);
    }

    #[tokio::test]
    async fn test_malformed_record_skipped_rest_ingested() {
        let h = harness(5, &[100]).await;
        h.source.push_batch(vec![
            json!({"Start Epoch": 5, "End Epoch": 9, "Content": {"title": "no id"}}),
            record(2, 5, 9),
        ]);

        h.poller.run_cycle().await;

        let sent = h.messenger.sent_to(100);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("#2"));
    }
}
