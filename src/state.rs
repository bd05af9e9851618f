//! Application state management
//!
//! Contains shared state accessible to the poll cycle and all webhook
//! handlers.

use crate::delivery::Messenger;
use crate::persist::{StateFile, StateSnapshot};
use crate::registry::{ProposalRegistry, RegistryStore};
use crate::source::GovernanceSource;
use crate::subscribers::SubscriberDirectory;
use crate::error::RelayResult;
use std::sync::Arc;

/// Application state shared across the poller and all handlers
pub struct AppState {
    /// Proposal registry (has internal locking)
    pub registry: RegistryStore,

    /// Subscribed chats (has internal locking)
    pub subscribers: SubscriberDirectory,

    /// Governance data source
    pub source: Arc<dyn GovernanceSource>,

    /// Outbound chat channel
    pub messenger: Arc<dyn Messenger>,

    /// Durable snapshot file
    pub state_file: StateFile,

    /// Hard upper bound for outbound message chunks
    pub max_message_len: usize,
}

impl AppState {
    pub fn new(
        source: Arc<dyn GovernanceSource>,
        messenger: Arc<dyn Messenger>,
        state_file: StateFile,
        max_message_len: usize,
        restored: Option<StateSnapshot>,
    ) -> Self {
        let (registry, subscribers) = match restored {
            Some(snapshot) => (
                RegistryStore::from_registry(ProposalRegistry::restore(
                    snapshot.proposals,
                    snapshot.notified,
                )),
                SubscriberDirectory::restore(snapshot.subscribers),
            ),
            None => (RegistryStore::new(), SubscriberDirectory::new()),
        };

        Self {
            registry,
            subscribers,
            source,
            messenger,
            state_file,
            max_message_len,
        }
    }

    /// Write the current registry and subscriber state to disk.
    pub async fn persist(&self) -> RelayResult<()> {
        let (proposals, notified) = self.registry.export().await;
        let subscribers = self.subscribers.snapshot().await;
        let snapshot = StateSnapshot::new(proposals, notified, subscribers);
        self.state_file.save(&snapshot).await
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
