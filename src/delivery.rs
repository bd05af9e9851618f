//! Delivery engine
//!
//! Fans batched message chunks out to subscribers, isolating per-recipient
//! failure: one broken chat never blocks delivery to the others.

use crate::error::RelayResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::error;

/// Outbound message channel to the chat platform
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> RelayResult<()>;
}

/// Per-fanout delivery counts, for logging/observability only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

impl DeliveryReport {
    fn merge(&mut self, other: DeliveryReport) {
        self.sent += other.sent;
        self.failed += other.failed;
    }
}

/// Send every chunk, in order, to every recipient.
///
/// Recipients are served in parallel (each send is an independent network
/// call); chunks to one recipient stay strictly sequential. Failures are
/// logged and counted, never propagated: a recipient may end up with a
/// partial sequence of chunks, and no retry is attempted.
pub async fn deliver(
    messenger: Arc<dyn Messenger>,
    recipients: &[i64],
    chunks: &[String],
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    if recipients.is_empty() || chunks.is_empty() {
        return report;
    }

    let chunks: Arc<[String]> = chunks.to_vec().into();
    let mut tasks = JoinSet::new();
    for &chat_id in recipients {
        let messenger = Arc::clone(&messenger);
        let chunks = Arc::clone(&chunks);
        tasks.spawn(async move {
            let mut report = DeliveryReport::default();
            for chunk in chunks.iter() {
                match messenger.send_message(chat_id, chunk).await {
                    Ok(()) => report.sent += 1,
                    Err(e) => {
                        error!("Failed to send notification to chat {}: {}", chat_id, e);
                        report.failed += 1;
                    }
                }
            }
            report
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(per_recipient) => report.merge(per_recipient),
            Err(e) => {
                error!("Delivery task failed: {}", e);
                report.failed += chunks.len();
            }
        }
    }
    report
}
