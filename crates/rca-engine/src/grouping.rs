//! Grouping engine (C7) — partitions enriched anomalies by
//! (service, component?, ring, time-bucket) and finalizes per-group stats.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, TimeZone, Utc};
use rca_core::{Diagnostics, EnrichedAnomalyEvent, GraphDirection, Ring};

use crate::config::GroupingConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyGroup {
    pub service: String,
    pub component: Option<String>,
    pub ring: Ring,
    pub bucket: DateTime<Utc>,
    pub events: Vec<EnrichedAnomalyEvent>,
    pub event_count: usize,
    pub distinct_transaction_count: usize,
    pub max_severity: f64,
    pub avg_severity: f64,
    pub max_anomaly_score: f64,
    pub avg_anomaly_score: f64,
    pub dominant_direction: GraphDirection,
    pub min_distance: i64,
    pub max_distance: i64,
    pub time_range_start: DateTime<Utc>,
    pub time_range_end: DateTime<Utc>,
    pub dimension_values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
struct GroupKey {
    service: String,
    component: Option<String>,
    ring: Ring,
    bucket_secs: i64,
}

fn bucket_start(timestamp: DateTime<Utc>, bucket_width_seconds: i64) -> DateTime<Utc> {
    let secs = timestamp.timestamp();
    let bucket_secs = (secs.div_euclid(bucket_width_seconds.max(1))) * bucket_width_seconds.max(1);
    Utc.timestamp_opt(bucket_secs, 0).single().unwrap_or(timestamp)
}

/// Upstream beats same beats "keep whatever came first" (spec.md §4.4).
fn merge_direction(current: GraphDirection, incoming: GraphDirection) -> GraphDirection {
    if incoming == current {
        return current;
    }
    if incoming == GraphDirection::Upstream {
        return GraphDirection::Upstream;
    }
    if current == GraphDirection::Upstream {
        return current;
    }
    if incoming == GraphDirection::Same {
        return GraphDirection::Same;
    }
    current
}

struct Accumulator {
    events: Vec<EnrichedAnomalyEvent>,
    dominant_direction: GraphDirection,
    min_distance: i64,
    max_distance: i64,
    time_range_start: DateTime<Utc>,
    time_range_end: DateTime<Utc>,
    dimension_values: BTreeMap<String, String>,
}

pub struct GroupingEngine;

impl GroupingEngine {
    /// Group `events`, extracting `dimension_names` (if any) from each
    /// event's tags into the group's dimension-value map — first-seen wins,
    /// a later conflicting value is recorded as a dimension miss rather
    /// than silently overwriting.
    pub fn group(
        events: &[EnrichedAnomalyEvent],
        config: &GroupingConfig,
        dimension_names: &[String],
        diagnostics: &mut Diagnostics,
    ) -> Vec<AnomalyGroup> {
        let mut accumulators: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();

        for event in events {
            let bucket = bucket_start(event.event.timestamp, config.bucket_width_seconds);
            let key = GroupKey {
                service: event.event.service.clone(),
                component: if config.group_by_component {
                    Some(event.event.component.clone())
                } else {
                    None
                },
                ring: event.ring,
                bucket_secs: bucket.timestamp(),
            };

            let acc = accumulators.entry(key).or_insert_with(|| Accumulator {
                events: Vec::new(),
                dominant_direction: event.direction,
                min_distance: event.distance,
                max_distance: event.distance,
                time_range_start: event.event.timestamp,
                time_range_end: event.event.timestamp,
                dimension_values: BTreeMap::new(),
            });

            acc.dominant_direction = merge_direction(acc.dominant_direction, event.direction);

            if event.distance >= 0 {
                if acc.min_distance < 0 || event.distance < acc.min_distance {
                    acc.min_distance = event.distance;
                }
                if event.distance > acc.max_distance {
                    acc.max_distance = event.distance;
                }
            }

            if event.event.timestamp < acc.time_range_start {
                acc.time_range_start = event.event.timestamp;
            }
            if event.event.timestamp > acc.time_range_end {
                acc.time_range_end = event.event.timestamp;
            }

            for name in dimension_names {
                if let Some(value) = event.event.tags.get(name) {
                    match acc.dimension_values.get(name) {
                        None => {
                            acc.dimension_values.insert(name.clone(), value.clone());
                        }
                        Some(existing) if existing != value => {
                            diagnostics.add_dimension_miss(format!(
                                "'{name}' conflicting values in group '{}': '{existing}' vs '{value}'",
                                event.event.service
                            ));
                        }
                        _ => {}
                    }
                }
            }

            acc.events.push(event.clone());
        }

        accumulators
            .into_iter()
            .map(|(key, acc)| Self::finalize(key, acc))
            .filter(|g| {
                g.event_count >= config.min_events_per_group
                    && g.max_severity >= config.min_severity
                    && g.max_anomaly_score >= config.min_anomaly_score
            })
            .collect()
    }

    fn finalize(key: GroupKey, acc: Accumulator) -> AnomalyGroup {
        let event_count = acc.events.len();
        let max_severity = acc
            .events
            .iter()
            .map(|e| e.event.severity)
            .fold(0.0_f64, f64::max);
        let avg_severity = if event_count > 0 {
            acc.events.iter().map(|e| e.event.severity).sum::<f64>() / event_count as f64
        } else {
            0.0
        };
        let max_anomaly_score = acc
            .events
            .iter()
            .map(|e| e.event.anomaly_score)
            .fold(0.0_f64, f64::max);
        let avg_anomaly_score = if event_count > 0 {
            acc.events.iter().map(|e| e.event.anomaly_score).sum::<f64>() / event_count as f64
        } else {
            0.0
        };
        let distinct_transaction_count: usize = acc
            .events
            .iter()
            .filter_map(|e| e.event.transaction_id())
            .collect::<HashSet<_>>()
            .len();

        let bucket = Utc
            .timestamp_opt(key.bucket_secs, 0)
            .single()
            .unwrap_or(acc.time_range_start);

        AnomalyGroup {
            service: key.service,
            component: key.component,
            ring: key.ring,
            bucket,
            events: acc.events,
            event_count,
            distinct_transaction_count,
            max_severity,
            avg_severity,
            max_anomaly_score,
            avg_anomaly_score,
            dominant_direction: acc.dominant_direction,
            min_distance: acc.min_distance,
            max_distance: acc.max_distance,
            time_range_start: acc.time_range_start,
            time_range_end: acc.time_range_end,
            dimension_values: acc.dimension_values,
        }
    }
}
