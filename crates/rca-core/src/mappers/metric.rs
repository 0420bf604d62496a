//! Maps a latency/threshold metric rule breach into an [`AnomalyEvent`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::anomaly::{AnomalyEvent, SignalKind, SourceType};

pub struct MetricRuleInput<'a> {
    pub source_id: &'a str,
    pub timestamp: DateTime<Utc>,
    pub service: &'a str,
    pub component: &'a str,
    pub metric_name: &'a str,
    pub current_value: f64,
    pub expected_value: f64,
    pub tags: HashMap<String, String>,
}

/// Severity scales with how far `current_value` has drifted from
/// `expected_value`, proportionally — a value at 2x expected is Medium, at
/// 4x is Critical, matching the intent of the isolation-forest ladder
/// without requiring a score from a model (latency/threshold rules are
/// rule-based, not model-scored, per spec.md §2 C4).
fn severity_from_deviation(current: f64, expected: f64) -> f64 {
    if expected <= 0.0 {
        return if current > 0.0 { 0.5 } else { 0.25 };
    }
    let ratio = (current / expected - 1.0).max(0.0);
    if ratio >= 3.0 {
        1.0
    } else if ratio >= 1.5 {
        0.75
    } else if ratio >= 0.5 {
        0.5
    } else {
        0.25
    }
}

pub fn anomaly_event_from_metric_rule(input: MetricRuleInput<'_>) -> AnomalyEvent {
    let severity = severity_from_deviation(input.current_value, input.expected_value);
    let score = (input.current_value / input.expected_value.max(f64::EPSILON) - 1.0)
        .max(0.0)
        .min(1.0);
    let mut event = AnomalyEvent::new(
        input.timestamp,
        input.service,
        input.component,
        SignalKind::Metrics,
        input.metric_name,
        input.current_value,
        severity,
        score,
        1.0,
        input.source_id,
        SourceType::Metric,
    );
    event.tags = input.tags;
    event
}
