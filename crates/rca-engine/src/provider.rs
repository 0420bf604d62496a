//! `AnomalyEventsProvider` — the abstract anomaly-corpus collaborator
//! consumed by the collector (C6).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rca_core::AnomalyEvent;

use crate::error::ProviderError;

/// Time-bounded fetch of anomalies. No ordering guarantee is required of
/// implementors — the collector sorts what it needs (spec.md §6).
#[async_trait]
pub trait AnomalyEventsProvider: Send + Sync {
    async fn get_anomalies(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        services: Option<&[String]>,
    ) -> Result<Vec<AnomalyEvent>, ProviderError>;
}

/// In-memory provider over a fixed corpus, primarily useful for tests and
/// for embedding callers that already have anomalies materialized (e.g.
/// a batch job that pre-fetched them). Mirrors the "own your client, the
/// core never constructs one" shape of `LlmClient` implementors in this
/// codebase's ancestry.
pub struct StaticAnomalyEventsProvider {
    events: Vec<AnomalyEvent>,
}

impl StaticAnomalyEventsProvider {
    pub fn new(events: Vec<AnomalyEvent>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl AnomalyEventsProvider for StaticAnomalyEventsProvider {
    async fn get_anomalies(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        services: Option<&[String]>,
    ) -> Result<Vec<AnomalyEvent>, ProviderError> {
        if end <= start {
            return Err(ProviderError::InvalidWindow);
        }
        Ok(self
            .events
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .filter(|e| match services {
                Some(list) => list.iter().any(|s| s == &e.service),
                None => true,
            })
            .cloned()
            .collect())
    }
}
