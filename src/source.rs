//! Governance source client
//!
//! Fetch-by-cursor access to the external governance service: the current
//! epoch number and any proposals newer than a given id. Raw records are
//! validated into typed proposals at this boundary; a malformed record is a
//! per-record error, never a batch failure.

use crate::config::SourceConfig;
use crate::error::{malformed_record, source_error, RelayError, RelayResult};
use crate::registry::Proposal;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// External governance data source
#[async_trait]
pub trait GovernanceSource: Send + Sync {
    /// Current epoch number. Fails transiently on network trouble.
    async fn current_epoch(&self) -> RelayResult<u64>;

    /// Raw proposal records with id greater than `since_id`.
    async fn proposals_since(&self, since_id: u64) -> RelayResult<Vec<RawProposalRecord>>;
}

/// A proposal record as the source serves it, before validation.
///
/// The source is loosely typed: numeric fields may arrive as JSON numbers or
/// as decimal strings, and any field may be missing entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProposalRecord {
    #[serde(rename = "Proposal Id")]
    pub proposal_id: Option<Value>,
    #[serde(rename = "Start Epoch")]
    pub start_epoch: Option<Value>,
    #[serde(rename = "End Epoch")]
    pub end_epoch: Option<Value>,
    #[serde(rename = "Content", default)]
    pub content: Value,
}

impl RawProposalRecord {
    /// Convert the raw record into a typed proposal.
    ///
    /// Missing or unparseable id/epoch fields and a missing title make the
    /// record malformed; the caller skips it with a log and keeps ingesting
    /// the rest of the batch.
    pub fn validate(self) -> RelayResult<Proposal> {
        let id = parse_u64(self.proposal_id.as_ref())
            .ok_or_else(|| malformed_record("missing or invalid 'Proposal Id'"))?;
        let start_epoch = parse_u64(self.start_epoch.as_ref())
            .ok_or_else(|| malformed_record(format!("proposal {}: missing or invalid 'Start Epoch'", id)))?;
        let end_epoch = parse_u64(self.end_epoch.as_ref())
            .ok_or_else(|| malformed_record(format!("proposal {}: missing or invalid 'End Epoch'", id)))?;
        let title = self
            .content
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| malformed_record(format!("proposal {}: missing title", id)))?;

        Ok(Proposal {
            id,
            start_epoch,
            end_epoch,
            title,
            content: self.content,
        })
    }
}

fn parse_u64(value: Option<&Value>) -> Option<u64> {
    match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct EpochResponse {
    epoch: u64,
}

/// HTTP implementation of the governance source
pub struct HttpGovernanceSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGovernanceSource {
    pub fn new(config: &SourceConfig) -> RelayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GovernanceSource for HttpGovernanceSource {
    async fn current_epoch(&self) -> RelayResult<u64> {
        let url = format!("{}/epoch", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| source_error(format!("epoch fetch failed: {}", e)))?;
        let body: EpochResponse = response
            .json()
            .await
            .map_err(|e| source_error(format!("epoch response unreadable: {}", e)))?;
        Ok(body.epoch)
    }

    async fn proposals_since(&self, since_id: u64) -> RelayResult<Vec<RawProposalRecord>> {
        let url = format!("{}/proposals", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("since_id", since_id)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| source_error(format!("proposal fetch failed: {}", e)))?;
        response
            .json()
            .await
            .map_err(|e| source_error(format!("proposal response unreadable: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawProposalRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_validate_complete_record() {
        let raw = record(json!({
            "Proposal Id": 12,
            "Start Epoch": 100,
            "End Epoch": 104,
            "Content": {"title": "Fund the relayer", "body": "..."},
        }));
        let proposal = raw.validate().unwrap();
        assert_eq!(proposal.id, 12);
        assert_eq!(proposal.start_epoch, 100);
        assert_eq!(proposal.end_epoch, 104);
        assert_eq!(proposal.title, "Fund the relayer");
    }

    #[test]
    fn test_validate_accepts_stringly_numbers() {
        let raw = record(json!({
            "Proposal Id": "12",
            "Start Epoch": "100",
            "End Epoch": "104",
            "Content": {"title": "t"},
        }));
        let proposal = raw.validate().unwrap();
        assert_eq!(proposal.id, 12);
        assert_eq!(proposal.start_epoch, 100);
    }

    #[test]
    fn test_validate_rejects_missing_id() {
        let raw = record(json!({
            "Start Epoch": 100,
            "End Epoch": 104,
            "Content": {"title": "t"},
        }));
        assert!(matches!(
            raw.validate(),
            Err(RelayError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_title() {
        let raw = record(json!({
            "Proposal Id": 3,
            "Start Epoch": 100,
            "End Epoch": 104,
            "Content": {},
        }));
        assert!(matches!(
            raw.validate(),
            Err(RelayError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_validate_rejects_garbage_epoch() {
        let raw = record(json!({
            "Proposal Id": 3,
            "Start Epoch": "soon",
            "End Epoch": 104,
            "Content": {"title": "t"},
        }));
        assert!(raw.validate().is_err());
    }
}
