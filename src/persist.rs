//! Durable state
//!
//! One JSON snapshot file holds the whole relay state: proposal records,
//! notified ids and the subscriber set. Written atomically (temp file +
//! rename) so a crash mid-save never leaves a truncated snapshot behind.

use crate::error::RelayResult;
use crate::registry::Proposal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Everything the relay needs to survive a restart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub proposals: Vec<Proposal>,
    pub notified: Vec<u64>,
    pub subscribers: Vec<i64>,
    pub saved_at: DateTime<Utc>,
}

impl StateSnapshot {
    pub fn new(proposals: Vec<Proposal>, notified: Vec<u64>, subscribers: Vec<i64>) -> Self {
        Self {
            proposals,
            notified,
            subscribers,
            saved_at: Utc::now(),
        }
    }
}

/// Snapshot file on disk
#[derive(Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the snapshot, or None on a cold start (no file yet).
    pub async fn load(&self) -> RelayResult<Option<StateSnapshot>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: StateSnapshot = serde_json::from_slice(&bytes)?;
        info!(
            "Restored relay state from {} ({} proposals, {} subscribers, saved {})",
            self.path.display(),
            snapshot.proposals.len(),
            snapshot.subscribers.len(),
            snapshot.saved_at
        );
        Ok(Some(snapshot))
    }

    /// Persist the snapshot atomically.
    pub async fn save(&self, snapshot: &StateSnapshot) -> RelayResult<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
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
    async fn test_missing_file_is_cold_start() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("state.json"));
        assert!(file.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("state.json"));

        let snapshot = StateSnapshot::new(
            vec![proposal(1, 5, 10), proposal(2, 7, 9)],
            vec![1],
            vec![100, 200],
        );
        file.save(&snapshot).await.unwrap();

        let restored = file.load().await.unwrap().unwrap();
        assert_eq!(restored.proposals.len(), 2);
        assert_eq!(restored.notified, vec![1]);
        assert_eq!(restored.subscribers, vec![100, 200]);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("state.json"));

        file.save(&StateSnapshot::new(vec![], vec![], vec![1]))
            .await
            .unwrap();
        file.save(&StateSnapshot::new(vec![proposal(3, 1, 2)], vec![3], vec![1, 2]))
            .await
            .unwrap();

        let restored = file.load().await.unwrap().unwrap();
        assert_eq!(restored.proposals.len(), 1);
        assert_eq!(restored.subscribers, vec![1, 2]);
    }
}
