//! Proposal data model
//!
//! Defines the typed proposal record and its notification texts.

use serde::{Deserialize, Serialize};

/// A governance proposal with an activity window of whole epochs.
///
/// Immutable once ingested: the registry never overwrites or removes a
/// record, so the first fetched version of a proposal is the one subscribers
/// are notified about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    /// Identifier assigned monotonically by the governance source
    pub id: u64,
    /// First epoch in which the proposal is active
    pub start_epoch: u64,
    /// Last epoch in which the proposal is active (inclusive)
    pub end_epoch: u64,
    /// Human-readable title, taken from the record's content block
    pub title: String,
    /// Remaining source content, kept opaque
    #[serde(default)]
    pub content: serde_json::Value,
}

impl Proposal {
    /// Text pushed to subscribers when the proposal enters its start epoch
    pub fn notification_text(&self) -> String {
        format!(
            "New governance proposal #{} is now active: {}\nVoting is open from epoch {} until the start of epoch {}",
            self.id,
            self.title,
            self.start_epoch,
            self.end_epoch + 1
        )
    }

    /// One-line summary used by the on-demand "active proposals" query
    pub fn summary_line(&self) -> String {
        format!(
            "#{} (ends on start of epoch {}): {}",
            self.id,
            self.end_epoch + 1,
            self.title
        )
    }
}
