//! Time-Ring classifier (C1) — buckets an event timestamp into a band
//! relative to the incident peak.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::anomaly::Ring;

/// Ring-band thresholds plus post-peak admission policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RingConfig {
    pub r1_seconds: i64,
    pub r2_seconds: i64,
    pub r3_seconds: i64,
    pub r4_seconds: i64,
    pub allow_events_after_peak: bool,
    pub time_after_peak_seconds: i64,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            r1_seconds: 5,
            r2_seconds: 30,
            r3_seconds: 120,
            r4_seconds: 600,
            allow_events_after_peak: true,
            time_after_peak_seconds: 30,
        }
    }
}

/// Classify an event timestamp `event_time` relative to the incident peak
/// `peak_time`, per spec.md §4.1.
pub fn classify_ring(peak_time: DateTime<Utc>, event_time: DateTime<Utc>, config: &RingConfig) -> Ring {
    if event_time > peak_time {
        let diff = (event_time - peak_time).num_seconds();
        return if config.allow_events_after_peak && diff <= config.time_after_peak_seconds {
            Ring::R1Immediate
        } else {
            Ring::ROutOfScope
        };
    }

    let diff = (peak_time - event_time).num_seconds();
    if diff <= config.r1_seconds {
        Ring::R1Immediate
    } else if diff <= config.r2_seconds {
        Ring::R2Short
    } else if diff <= config.r3_seconds {
        Ring::R3Medium
    } else if diff <= config.r4_seconds {
        Ring::R4Long
    } else {
        Ring::ROutOfScope
    }
}
