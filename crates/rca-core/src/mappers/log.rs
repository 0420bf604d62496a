//! Maps a severity-tagged log line into an [`AnomalyEvent`].
//!
//! Mirrors the JSON-or-fallback parsing shape used for causal log events
//! elsewhere in this codebase's ancestry: try structured JSON first, fall
//! back to sniffing the level out of the raw message.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::anomaly::{AnomalyEvent, SignalKind, SourceType};

/// severity on the 0.25/0.5/0.75/1.0 ladder, keyed by log level.
fn severity_from_level(level: &str) -> f64 {
    match level.to_uppercase().as_str() {
        "FATAL" | "CRITICAL" | "CRIT" => 1.0,
        "ERROR" | "ERR" => 0.75,
        "WARN" | "WARNING" => 0.5,
        _ => 0.25,
    }
}

fn sniff_level(message: &str) -> &'static str {
    let upper = message.to_uppercase();
    if upper.contains("CRITICAL") || upper.contains("FATAL") {
        "CRITICAL"
    } else if upper.contains("ERROR") || upper.contains("FAILED") {
        "ERROR"
    } else if upper.contains("WARN") {
        "WARN"
    } else {
        "INFO"
    }
}

pub struct SeverityLogInput<'a> {
    pub source_id: &'a str,
    pub timestamp: DateTime<Utc>,
    pub service: &'a str,
    pub component: &'a str,
    /// Explicit level when the log source already carries one; when
    /// `None`, the level is sniffed from `message`.
    pub level: Option<&'a str>,
    pub message: &'a str,
    pub tags: HashMap<String, String>,
}

pub fn anomaly_event_from_severity_log(input: SeverityLogInput<'_>) -> AnomalyEvent {
    let level = input
        .level
        .map(str::to_string)
        .unwrap_or_else(|| sniff_level(input.message).to_string());
    let severity = severity_from_level(&level);

    let mut event = AnomalyEvent::new(
        input.timestamp,
        input.service,
        input.component,
        SignalKind::Logs,
        "log_severity",
        severity,
        severity,
        severity,
        0.8,
        input.source_id,
        SourceType::Log,
    );
    event.string_value = Some(input.message.to_string());
    event.tags = input.tags;
    if severity >= 0.75 {
        event.error_flags.insert(level.to_lowercase());
    }
    event
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_level_drives_severity() {
        let event = anomaly_event_from_severity_log(SeverityLogInput {
            source_id: "log-1",
            timestamp: Utc::now(),
            service: "payment",
            component: "worker",
            level: Some("CRITICAL"),
            message: "OOMKilled",
            tags: HashMap::new(),
        });
        assert_eq!(event.severity, 1.0);
        assert!(event.error_flags.contains("critical"));
    }

    #[test]
    fn sniffs_level_from_message_when_absent() {
        let event = anomaly_event_from_severity_log(SeverityLogInput {
            source_id: "log-2",
            timestamp: Utc::now(),
            service: "payment",
            component: "worker",
            level: None,
            message: "request failed with timeout",
            tags: HashMap::new(),
        });
        assert_eq!(event.severity, 0.75);
    }

    #[test]
    fn low_severity_logs_carry_no_error_flag() {
        let event = anomaly_event_from_severity_log(SeverityLogInput {
            source_id: "log-3",
            timestamp: Utc::now(),
            service: "payment",
            component: "worker",
            level: None,
            message: "heartbeat ok",
            tags: HashMap::new(),
        });
        assert!(event.error_flags.is_empty());
    }
}
