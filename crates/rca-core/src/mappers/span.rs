//! Maps an isolation-forest-scored trace span into an [`AnomalyEvent`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::anomaly::{
    severity_from_isolation_forest_score, AnomalyEvent, IsolationForestDetails, SignalKind,
    SourceType,
};

/// Raw fields as they arrive from the span-scoring pipeline. This is the
/// shape an upstream isolation-forest job hands the collector — the core
/// never runs the model itself (spec.md Non-goals).
pub struct IsolationForestSpanInput<'a> {
    pub span_id: &'a str,
    pub timestamp: DateTime<Utc>,
    pub service: &'a str,
    pub operation: &'a str,
    pub duration_ms: f64,
    pub is_anomaly: bool,
    pub anomaly_score: f64,
    pub features: Vec<f64>,
    pub tags: HashMap<String, String>,
}

/// Build an [`AnomalyEvent`] from a scored span. Severity is derived from
/// the isolation-forest score via the shared ladder (spec.md §8 scenario
/// 2); an event is only produced — by convention of the caller — for
/// spans the upstream model actually flagged, but this mapper itself does
/// not enforce that, so `is_anomaly: false` spans still map cleanly (the
/// collector's severity/score thresholds filter them out later).
pub fn anomaly_event_from_isolation_forest_span(input: IsolationForestSpanInput<'_>) -> AnomalyEvent {
    let severity = severity_from_isolation_forest_score(input.anomaly_score);
    let mut event = AnomalyEvent::new(
        input.timestamp,
        input.service,
        input.operation,
        SignalKind::Traces,
        "span_duration_ms",
        input.duration_ms,
        severity,
        input.anomaly_score,
        1.0,
        input.span_id,
        SourceType::Span,
    );
    event.tags = input.tags;
    event.isolation_forest = Some(IsolationForestDetails {
        is_anomaly: input.is_anomaly,
        raw_score: input.anomaly_score,
        features: if input.features.is_empty() {
            None
        } else {
            Some(input.features)
        },
    });
    event
}
