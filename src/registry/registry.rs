//! Proposal registry core
//!
//! Synchronous dedup state: which proposals are known and which have already
//! triggered an activation notification. All ordering guarantees (ascending
//! proposal id) fall out of the BTreeMap key order.

use crate::registry::Proposal;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// In-memory registry of proposals and notification state.
///
/// Invariants:
/// - `notified` is always a subset of `records` keys
/// - an id enters `notified` at most once
/// - a record, once inserted, is never mutated or removed
#[derive(Debug, Default)]
pub struct ProposalRegistry {
    records: BTreeMap<u64, Proposal>,
    notified: BTreeSet<u64>,
}

impl ProposalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from persisted state.
    ///
    /// Notified ids that have no matching record are dropped with a warning,
    /// keeping the subset invariant intact even if the snapshot was written
    /// by a buggy or older build.
    pub fn restore(proposals: Vec<Proposal>, notified: Vec<u64>) -> Self {
        let records: BTreeMap<u64, Proposal> =
            proposals.into_iter().map(|p| (p.id, p)).collect();
        let mut kept = BTreeSet::new();
        for id in notified {
            if records.contains_key(&id) {
                kept.insert(id);
            } else {
                warn!("Dropping notified id {} with no matching proposal record", id);
            }
        }
        Self {
            records,
            notified: kept,
        }
    }

    /// Insert fetched proposals, first write wins.
    ///
    /// Duplicate ids are skipped so a re-fetch can never overwrite the record
    /// subscribers were (or will be) notified about. Returns how many records
    /// were actually inserted.
    pub fn ingest(&mut self, fetched: Vec<Proposal>) -> usize {
        let mut inserted = 0;
        for proposal in fetched {
            if self.records.contains_key(&proposal.id) {
                continue;
            }
            self.records.insert(proposal.id, proposal);
            inserted += 1;
        }
        inserted
    }

    /// Proposals whose start epoch is exactly `current_epoch` and which have
    /// not been notified yet, in ascending id order.
    ///
    /// Every returned id is marked notified in the same call, so a proposal
    /// is handed to the delivery path at most once across the registry's
    /// lifetime. Start-epoch equality (not a range check) is what keeps a
    /// proposal from re-triggering on every cycle while it stays active.
    pub fn newly_active(&mut self, current_epoch: u64) -> Vec<Proposal> {
        let mut out = Vec::new();
        for (id, proposal) in &self.records {
            if proposal.start_epoch != current_epoch || self.notified.contains(id) {
                continue;
            }
            out.push(proposal.clone());
        }
        for proposal in &out {
            self.notified.insert(proposal.id);
        }
        out
    }

    /// All known proposals active at `epoch` (start <= epoch <= end),
    /// ascending id order. Pure query.
    pub fn active_at(&self, epoch: u64) -> Vec<Proposal> {
        self.records
            .values()
            .filter(|p| p.start_epoch <= epoch && epoch <= p.end_epoch)
            .cloned()
            .collect()
    }

    /// Highest known proposal id, or 0 when the registry is empty. Used as
    /// the fetch cursor against the governance source.
    pub fn cursor(&self) -> u64 {
        self.records.keys().next_back().copied().unwrap_or(0)
    }

    /// Number of known proposals
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Export the registry for persistence: all records plus notified ids.
    pub fn export(&self) -> (Vec<Proposal>, Vec<u64>) {
        (
            self.records.values().cloned().collect(),
            self.notified.iter().copied().collect(),
        )
    }
}
