//! Incident detector (C5) — derives an `IncidentContext` from one metric
//! time series. See SPEC_FULL.md §4.7 for the behavior this fills in
//! beyond what spec.md states directly.

use chrono::{DateTime, Utc};
use rca_core::{ImpactDirection, ImpactSignal, IncidentContext};
use serde::{Deserialize, Serialize};

/// One `(timestamp, value)` sample of the impact metric's time series.
pub type MetricPoint = (DateTime<Utc>, f64);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IncidentDetectorConfig {
    pub threshold_percent_above_normal: f64,
    pub min_duration_for_incident_seconds: i64,
    pub recovery_threshold: f64,
}

impl Default for IncidentDetectorConfig {
    fn default() -> Self {
        Self {
            threshold_percent_above_normal: 50.0,
            min_duration_for_incident_seconds: 10,
            recovery_threshold: 0.3,
        }
    }
}

fn breaches(value: f64, baseline: f64, direction: ImpactDirection, config: &IncidentDetectorConfig) -> bool {
    let margin = config.threshold_percent_above_normal / 100.0;
    match direction {
        ImpactDirection::HigherIsWorse => value >= baseline * (1.0 + margin),
        ImpactDirection::LowerIsWorse => value <= baseline * (1.0 - margin),
    }
}

fn deviation_from_baseline(value: f64, baseline: f64, direction: ImpactDirection) -> f64 {
    match direction {
        ImpactDirection::HigherIsWorse => value - baseline,
        ImpactDirection::LowerIsWorse => baseline - value,
    }
}

fn recovered(value: f64, baseline: f64, peak_deviation: f64, direction: ImpactDirection, config: &IncidentDetectorConfig) -> bool {
    if peak_deviation <= 0.0 {
        return true;
    }
    let current_deviation = deviation_from_baseline(value, baseline, direction);
    current_deviation < peak_deviation * config.recovery_threshold
}

/// Severity on the same 0.25/0.5/0.75/1.0 ladder used by [`AnomalyEvent`]
/// (SPEC_FULL.md §4.7): a peak exactly at the breach threshold scores Low,
/// a peak at 3x the breach margin or more scores Critical.
fn severity_from_peak(peak_deviation: f64, breach_margin: f64) -> f64 {
    if breach_margin <= 0.0 {
        return 0.5;
    }
    let ratio = peak_deviation / breach_margin;
    if ratio >= 3.0 {
        1.0
    } else if ratio >= 2.0 {
        0.75
    } else if ratio >= 1.0 {
        0.5
    } else {
        0.25
    }
}

/// Detect an incident from an ascending-timestamp metric series. Returns
/// `None` when no sustained breach is found — absence is a valid outcome,
/// not an error.
pub fn detect_incident(
    id: impl Into<String>,
    signal: ImpactSignal,
    series: &[MetricPoint],
    config: &IncidentDetectorConfig,
) -> Option<IncidentContext> {
    if series.len() < 2 {
        return None;
    }

    let baseline_window_len = (series.len() / 2).max(1);
    let baseline: f64 = series[..baseline_window_len].iter().map(|(_, v)| v).sum::<f64>()
        / baseline_window_len as f64;
    let baseline = if baseline.abs() > f64::EPSILON {
        baseline
    } else {
        signal.threshold
    };

    let breach_margin = baseline * (config.threshold_percent_above_normal / 100.0);

    let breach_start_idx = series
        .iter()
        .position(|(_, v)| breaches(*v, baseline, signal.direction, config))?;

    let t_start = series[breach_start_idx].0;

    // find the peak within the sustained breach window
    let mut peak_idx = breach_start_idx;
    let mut peak_deviation = deviation_from_baseline(series[breach_start_idx].1, baseline, signal.direction);
    let mut last_breaching_idx = breach_start_idx;

    for (i, (_, value)) in series.iter().enumerate().skip(breach_start_idx + 1) {
        if breaches(*value, baseline, signal.direction, config) {
            last_breaching_idx = i;
            let deviation = deviation_from_baseline(*value, baseline, signal.direction);
            if deviation > peak_deviation {
                peak_deviation = deviation;
                peak_idx = i;
            }
        } else if recovered(*value, baseline, peak_deviation, signal.direction, config) {
            break;
        }
    }

    let t_peak = series[peak_idx].0;
    let duration = (t_peak - t_start).num_seconds().max(
        (series[last_breaching_idx].0 - t_start).num_seconds(),
    );
    if duration < config.min_duration_for_incident_seconds {
        return None;
    }

    let t_end = series[last_breaching_idx].0;
    let severity = severity_from_peak(peak_deviation, breach_margin);

    Some(IncidentContext {
        id: id.into(),
        impact_service: signal.service.clone(),
        impact_signal: signal,
        t_start,
        t_peak,
        t_end: if t_end > t_peak { t_end } else { t_peak },
        severity,
        kpi: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn signal() -> ImpactSignal {
        ImpactSignal {
            service: "api-gw".to_string(),
            metric: "error_rate".to_string(),
            labels: None,
            direction: ImpactDirection::HigherIsWorse,
            threshold: 0.1,
        }
    }

    fn series_with_spike() -> Vec<MetricPoint> {
        let base = Utc::now();
        vec![
            (base, 10.0),
            (base + Duration::seconds(10), 10.0),
            (base + Duration::seconds(20), 10.0),
            (base + Duration::seconds(30), 11.0),
            (base + Duration::seconds(40), 40.0),
            (base + Duration::seconds(50), 45.0),
            (base + Duration::seconds(60), 42.0),
            (base + Duration::seconds(70), 11.0),
            (base + Duration::seconds(80), 10.0),
        ]
    }

    #[test]
    fn detects_a_sustained_breach() {
        let config = IncidentDetectorConfig::default();
        let incident = detect_incident("inc-1", signal(), &series_with_spike(), &config).unwrap();
        assert!(incident.t_start < incident.t_peak);
        assert!(incident.t_peak <= incident.t_end);
        assert!(incident.severity > 0.0);
    }

    #[test]
    fn no_breach_returns_none() {
        let base = Utc::now();
        let flat: Vec<MetricPoint> = (0..10)
            .map(|i| (base + Duration::seconds(i * 10), 10.0))
            .collect();
        let config = IncidentDetectorConfig::default();
        assert!(detect_incident("inc-2", signal(), &flat, &config).is_none());
    }

    #[test]
    fn too_short_series_returns_none() {
        let config = IncidentDetectorConfig::default();
        assert!(detect_incident("inc-3", signal(), &[(Utc::now(), 100.0)], &config).is_none());
    }

    #[test]
    fn transient_spike_shorter_than_min_duration_is_noise() {
        let base = Utc::now();
        let series = vec![
            (base, 10.0),
            (base + Duration::seconds(1), 10.0),
            (base + Duration::seconds(2), 100.0),
            (base + Duration::seconds(3), 10.0),
            (base + Duration::seconds(4), 10.0),
        ];
        let config = IncidentDetectorConfig {
            min_duration_for_incident_seconds: 10,
            ..IncidentDetectorConfig::default()
        };
        assert!(detect_incident("inc-4", signal(), &series, &config).is_none());
    }

    #[test]
    fn severity_scales_with_peak_deviation() {
        assert_eq!(severity_from_peak(5.0, 5.0), 0.5);
        assert_eq!(severity_from_peak(10.0, 5.0), 0.75);
        assert_eq!(severity_from_peak(20.0, 5.0), 1.0);
        assert_eq!(severity_from_peak(2.0, 5.0), 0.25);
    }
}
