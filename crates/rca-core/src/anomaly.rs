//! Normalized anomaly events — the common currency between signal sources
//! (spans, metrics, logs, change events) and the grouping/scoring stages.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which kind of telemetry a signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Metrics,
    Traces,
    Logs,
    Change,
}

/// The concrete record type that produced an [`AnomalyEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Span,
    Log,
    Metric,
}

/// Ladder used to quantize a raw anomaly score into a discrete severity.
/// Matches the Low/Medium/High/Critical -> 0.25/0.5/0.75/1.0 mapping from
/// the spec's severity ladder (scenario 2, §8).
pub fn severity_from_isolation_forest_score(anomaly_score: f64) -> f64 {
    if anomaly_score >= 0.8 {
        1.0
    } else if anomaly_score >= 0.6 {
        0.75
    } else if anomaly_score >= 0.4 {
        0.5
    } else {
        0.25
    }
}

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Optional isolation-forest-derived fields carried alongside a mapped event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForestDetails {
    pub is_anomaly: bool,
    pub raw_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<f64>>,
}

/// A normalized anomaly observation. Immutable once constructed — mapper
/// functions (see [`crate::mappers`]) are the only code allowed to build
/// one, and they clamp severity/score/confidence to `[0,1]` before handing
/// it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub component: String,
    pub signal_kind: SignalKind,
    pub metric_name: String,
    pub field_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    pub severity: f64,
    pub anomaly_score: f64,
    pub confidence: f64,
    #[serde(default)]
    pub error_flags: HashSet<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    pub source_id: String,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolation_forest: Option<IsolationForestDetails>,
}

impl AnomalyEvent {
    /// Construct a new event, clamping the three bounded fields. This is
    /// the single choke point every mapper funnels through, so the
    /// "severity/score/confidence always in [0,1]" invariant (spec.md §3)
    /// cannot be violated by a mapper bug.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timestamp: DateTime<Utc>,
        service: impl Into<String>,
        component: impl Into<String>,
        signal_kind: SignalKind,
        metric_name: impl Into<String>,
        field_value: f64,
        severity: f64,
        anomaly_score: f64,
        confidence: f64,
        source_id: impl Into<String>,
        source_type: SourceType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            service: service.into(),
            component: component.into(),
            signal_kind,
            metric_name: metric_name.into(),
            field_value,
            string_value: None,
            severity: clamp01(severity),
            anomaly_score: clamp01(anomaly_score),
            confidence: clamp01(confidence),
            error_flags: HashSet::new(),
            tags: HashMap::new(),
            source_id: source_id.into(),
            source_type,
            isolation_forest: None,
        }
    }

    /// Read an isolation-forest score from a tags map, accepting both
    /// attribute-name spellings seen in the wild (open question #2, §9).
    pub fn isolation_forest_score_from_tags(tags: &HashMap<String, String>) -> Option<f64> {
        tags.get("iforest_anomaly_score")
            .or_else(|| tags.get("iforest.anomaly_score"))
            .and_then(|v| v.parse::<f64>().ok())
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.tags.get("transaction_id").map(|s| s.as_str())
    }
}

/// Direction of an anomaly's service relative to the incident's impact
/// service, as determined by the service-dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphDirection {
    Upstream,
    Downstream,
    Same,
    Unknown,
}

/// Temporal band of an event relative to the incident peak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ring {
    R1Immediate,
    R2Short,
    R3Medium,
    R4Long,
    ROutOfScope,
}

impl Ring {
    /// Priority used for sorting (0 = closest to peak). `R_OUT_OF_SCOPE`
    /// is a sentinel, always last.
    pub fn priority(self) -> u32 {
        match self {
            Ring::R1Immediate => 0,
            Ring::R2Short => 1,
            Ring::R3Medium => 2,
            Ring::R4Long => 3,
            Ring::ROutOfScope => 999,
        }
    }
}

/// [`AnomalyEvent`] enriched with ring, graph direction and hop distance.
/// Derived exactly once by the collector (C6); never mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedAnomalyEvent {
    pub event: AnomalyEvent,
    pub ring: Ring,
    pub direction: GraphDirection,
    /// Hop distance to the impact service. `-1` means unknown.
    pub distance: i64,
    pub impact_service: String,
}

impl EnrichedAnomalyEvent {
    pub fn new(
        event: AnomalyEvent,
        ring: Ring,
        direction: GraphDirection,
        distance: i64,
        impact_service: impl Into<String>,
    ) -> Self {
        Self {
            event,
            ring,
            direction,
            distance,
            impact_service: impact_service.into(),
        }
    }
}
