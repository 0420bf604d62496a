//! Anomaly collector (C6) — fetches anomalies in-window and enriches each
//! with ring + graph direction + distance relative to the incident.

use std::collections::HashMap;

use chrono::Duration;
use rca_core::{
    classify_ring, AnomalyEvent, Diagnostics, EnrichedAnomalyEvent, GraphDirection, IncidentContext,
    Ring, ServiceGraph,
};

use crate::config::CollectOptions;
use crate::error::CollectError;
use crate::provider::AnomalyEventsProvider;

pub struct AnomalyCollector<'a, P: AnomalyEventsProvider> {
    provider: &'a P,
    graph: &'a ServiceGraph,
}

impl<'a, P: AnomalyEventsProvider> AnomalyCollector<'a, P> {
    pub fn new(provider: &'a P, graph: &'a ServiceGraph) -> Self {
        Self { provider, graph }
    }

    pub async fn collect(
        &self,
        incident: &IncidentContext,
        options: &CollectOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<EnrichedAnomalyEvent>, CollectError> {
        let start = incident.t_start - Duration::seconds(options.pad_before_seconds);
        let end = incident.t_end + Duration::seconds(options.pad_after_seconds);

        let services = options.allowed_services.as_deref();
        let raw = self
            .provider
            .get_anomalies(start, end, services)
            .await
            .map_err(CollectError::Provider)?;

        let filtered: Vec<AnomalyEvent> = raw
            .into_iter()
            .filter(|e| e.severity >= options.min_severity)
            .filter(|e| e.anomaly_score >= options.min_anomaly_score)
            .filter(|e| match &options.allowed_signal_kinds {
                Some(kinds) => kinds.contains(&e.signal_kind),
                None => true,
            })
            .collect();

        let mut enriched = Vec::with_capacity(filtered.len());
        for event in filtered {
            let enrichment = self.enrich(&event, incident, &options.ring_config)?;
            enriched.push(enrichment);
        }

        if options.max_events_per_ring > 0 {
            enriched = self.truncate_per_ring(enriched, options.max_events_per_ring);
        }

        if options.sort_by_priority {
            enriched.sort_by(|a, b| {
                a.ring
                    .priority()
                    .cmp(&b.ring.priority())
                    .then(
                        b.event
                            .severity
                            .partial_cmp(&a.event.severity)
                            .unwrap_or(std::cmp::Ordering::Equal),
                    )
                    .then(
                        b.event
                            .anomaly_score
                            .partial_cmp(&a.event.anomaly_score)
                            .unwrap_or(std::cmp::Ordering::Equal),
                    )
                    .then(a.event.timestamp.cmp(&b.event.timestamp))
            });
        }

        if enriched.is_empty() {
            diagnostics.add_reduced_accuracy_reason("no anomalies found in the incident window");
        }

        Ok(enriched)
    }

    fn enrich(
        &self,
        event: &AnomalyEvent,
        incident: &IncidentContext,
        ring_config: &rca_core::RingConfig,
    ) -> Result<EnrichedAnomalyEvent, CollectError> {
        let ring = classify_ring(incident.t_peak, event.timestamp, ring_config);

        let (direction, distance) = if event.service == incident.impact_service {
            (GraphDirection::Same, 0)
        } else if self.graph.is_upstream(&event.service, &incident.impact_service)? {
            let path = self
                .graph
                .shortest_path(&event.service, &incident.impact_service)?;
            let dist = path.map(|p| p.len() as i64 - 1).unwrap_or(-1);
            (GraphDirection::Upstream, dist)
        } else if self.graph.is_upstream(&incident.impact_service, &event.service)? {
            let path = self
                .graph
                .shortest_path(&incident.impact_service, &event.service)?;
            let dist = path.map(|p| p.len() as i64 - 1).unwrap_or(-1);
            (GraphDirection::Downstream, dist)
        } else {
            (GraphDirection::Unknown, -1)
        };

        Ok(EnrichedAnomalyEvent::new(
            event.clone(),
            ring,
            direction,
            distance,
            incident.impact_service.clone(),
        ))
    }

    fn truncate_per_ring(
        &self,
        events: Vec<EnrichedAnomalyEvent>,
        max_per_ring: usize,
    ) -> Vec<EnrichedAnomalyEvent> {
        let mut counts: HashMap<Ring, usize> = HashMap::new();
        let mut kept = Vec::with_capacity(events.len());
        for event in events {
            let count = counts.entry(event.ring).or_insert(0);
            if *count < max_per_ring {
                *count += 1;
                kept.push(event);
            }
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticAnomalyEventsProvider;
    use chrono::Utc;
    use rca_core::{ImpactDirection, ImpactSignal, ServiceEdge, SignalKind, SourceType};

    fn incident(peak: chrono::DateTime<Utc>) -> IncidentContext {
        IncidentContext {
            id: "inc-1".to_string(),
            impact_service: "api-gw".to_string(),
            impact_signal: ImpactSignal {
                service: "api-gw".to_string(),
                metric: "error_rate".to_string(),
                labels: None,
                direction: ImpactDirection::HigherIsWorse,
                threshold: 0.1,
            },
            t_start: peak - Duration::minutes(5),
            t_peak: peak,
            t_end: peak + Duration::minutes(1),
            severity: 0.8,
            kpi: None,
        }
    }

    fn event(service: &str, ts: chrono::DateTime<Utc>, severity: f64) -> AnomalyEvent {
        AnomalyEvent::new(
            ts,
            service,
            "comp",
            SignalKind::Metrics,
            "error_rate",
            1.0,
            severity,
            0.9,
            1.0,
            "src",
            SourceType::Metric,
        )
    }

    fn chain_graph() -> ServiceGraph {
        let graph = ServiceGraph::new();
        graph.add_edge(ServiceEdge::new("api-gw", "tps")).unwrap();
        graph.add_edge(ServiceEdge::new("tps", "kafka")).unwrap();
        graph.add_edge(ServiceEdge::new("kafka", "cassandra")).unwrap();
        graph
    }

    #[tokio::test]
    async fn enriches_with_direction_and_distance() {
        let peak = Utc::now();
        let incident = incident(peak);
        let graph = chain_graph();
        let provider = StaticAnomalyEventsProvider::new(vec![
            event("cassandra", peak - Duration::minutes(5), 0.75),
            event("api-gw", peak - Duration::minutes(3), 0.75),
        ]);

        let collector = AnomalyCollector::new(&provider, &graph);
        let mut diagnostics = Diagnostics::new();
        let result = collector
            .collect(&incident, &CollectOptions::default(), &mut diagnostics)
            .await
            .unwrap();

        // cassandra is reached by following call edges from api-gw, not the
        // other way around, so it is downstream of the impact service.
        let cassandra_event = result.iter().find(|e| e.event.service == "cassandra").unwrap();
        assert_eq!(cassandra_event.direction, GraphDirection::Downstream);
        assert_eq!(cassandra_event.distance, 3);

        let same_service_event = result.iter().find(|e| e.event.service == "api-gw").unwrap();
        assert_eq!(same_service_event.direction, GraphDirection::Same);
        assert_eq!(same_service_event.distance, 0);
    }

    #[tokio::test]
    async fn empty_corpus_yields_reduced_accuracy_note() {
        let peak = Utc::now();
        let incident = incident(peak);
        let graph = chain_graph();
        let provider = StaticAnomalyEventsProvider::new(vec![]);

        let collector = AnomalyCollector::new(&provider, &graph);
        let mut diagnostics = Diagnostics::new();
        let result = collector
            .collect(&incident, &CollectOptions::default(), &mut diagnostics)
            .await
            .unwrap();

        assert!(result.is_empty());
        assert!(!diagnostics.to_notes().is_empty());
    }

    #[tokio::test]
    async fn max_events_per_ring_truncates() {
        let peak = Utc::now();
        let incident = incident(peak);
        let graph = chain_graph();
        let provider = StaticAnomalyEventsProvider::new(vec![
            event("cassandra", peak - Duration::seconds(1), 0.5),
            event("cassandra", peak - Duration::seconds(2), 0.6),
            event("cassandra", peak - Duration::seconds(3), 0.7),
        ]);

        let collector = AnomalyCollector::new(&provider, &graph);
        let mut diagnostics = Diagnostics::new();
        let options = CollectOptions {
            max_events_per_ring: 1,
            ..CollectOptions::default()
        };
        let result = collector.collect(&incident, &options, &mut diagnostics).await.unwrap();
        assert_eq!(result.len(), 1);
    }
}
