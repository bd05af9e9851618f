//! Registry storage
//!
//! Thread-safe wrapper around the proposal registry. The poll cycle and the
//! webhook handlers share this store; mutations go through the write lock so
//! two concurrent callers can never both observe a proposal as un-notified.

use crate::registry::{Proposal, ProposalRegistry};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe registry store
#[derive(Clone)]
pub struct RegistryStore {
    inner: Arc<RwLock<ProposalRegistry>>,
}

impl RegistryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(ProposalRegistry::new())),
        }
    }

    pub fn from_registry(registry: ProposalRegistry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    /// Insert fetched proposals; returns how many were new
    pub async fn ingest(&self, fetched: Vec<Proposal>) -> usize {
        let mut registry = self.inner.write().await;
        registry.ingest(fetched)
    }

    /// Proposals entering their start epoch right now, marked notified while
    /// the write lock is held.
    ///
    /// Marking happens at compute time, not at confirmed delivery: a crash
    /// between this call and the actual sends loses those notifications.
    /// At-most-once is the deliberate tradeoff here, never duplicates.
    pub async fn newly_active(&self, current_epoch: u64) -> Vec<Proposal> {
        let mut registry = self.inner.write().await;
        registry.newly_active(current_epoch)
    }

    /// All proposals active at the given epoch (read-only)
    pub async fn active_at(&self, epoch: u64) -> Vec<Proposal> {
        let registry = self.inner.read().await;
        registry.active_at(epoch)
    }

    /// Current fetch cursor (read-only)
    pub async fn cursor(&self) -> u64 {
        let registry = self.inner.read().await;
        registry.cursor()
    }

    /// Number of known proposals
    pub async fn count(&self) -> usize {
        let registry = self.inner.read().await;
        registry.len()
    }

    /// Export registry state for persistence
    pub async fn export(&self) -> (Vec<Proposal>, Vec<u64>) {
        let registry = self.inner.read().await;
        registry.export()
    }
}

impl Default for RegistryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(id: u64, start: u64, end: u64) -> Proposal {
        Proposal {
            id,
            start_epoch: start,
            end_epoch: end,
            title: format!("Proposal {}", id),
            content: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn test_concurrent_newly_active_notifies_once() {
        let store = RegistryStore::new();
        store.ingest(vec![proposal(1, 10, 20)]).await;

        let a = store.clone();
        let b = store.clone();
        let (left, right) = tokio::join!(a.newly_active(10), b.newly_active(10));

        // Exactly one of the two concurrent callers wins the proposal
        assert_eq!(left.len() + right.len(), 1);
    }

    #[tokio::test]
    async fn test_store_queries() {
        let store = RegistryStore::new();
        assert_eq!(store.cursor().await, 0);

        store.ingest(vec![proposal(4, 2, 6), proposal(9, 3, 5)]).await;
        assert_eq!(store.cursor().await, 9);
        assert_eq!(store.count().await, 2);
        assert_eq!(store.active_at(4).await.len(), 2);
    }
}
