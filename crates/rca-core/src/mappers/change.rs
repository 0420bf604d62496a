//! Maps a deployment/config change event into an [`AnomalyEvent`].
//!
//! Change events (deploys, feature-flag flips, config pushes) carry no
//! numeric score of their own; severity is fixed at Medium unless the
//! caller flags the change as risky, since a change is always worth
//! surfacing as a candidate cause once it falls in-window, but should not
//! out-rank a hard error signal by default.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::anomaly::{AnomalyEvent, SignalKind, SourceType};

pub struct ChangeEventInput<'a> {
    pub source_id: &'a str,
    pub timestamp: DateTime<Utc>,
    pub service: &'a str,
    pub component: &'a str,
    pub change_kind: &'a str,
    pub description: &'a str,
    pub risky: bool,
    pub tags: HashMap<String, String>,
}

pub fn anomaly_event_from_change_event(input: ChangeEventInput<'_>) -> AnomalyEvent {
    let severity = if input.risky { 0.75 } else { 0.5 };
    let mut event = AnomalyEvent::new(
        input.timestamp,
        input.service,
        input.component,
        SignalKind::Change,
        input.change_kind,
        1.0,
        severity,
        severity,
        0.9,
        input.source_id,
        SourceType::Log,
    );
    event.string_value = Some(input.description.to_string());
    event.tags = input.tags;
    event
}
