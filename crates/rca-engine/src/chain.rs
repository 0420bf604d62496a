//! Chain construction — assembles ordered "why" steps from a candidate
//! cause back toward the impact service, with templated evidence
//! summaries (spec.md §4.6).

use chrono::{DateTime, Utc};
use rca_core::{Diagnostics, GraphDirection, Ring, ServiceGraph};

use crate::error::ChainError;
use crate::scoring::CandidateCause;

/// Length-discount floor applied to a chain's mean step score (spec.md §8
/// invariant: `chain.score >= 0.5 * mean(stepScores)`).
const LENGTH_DISCOUNT_FLOOR: f64 = 0.5;
const LENGTH_DISCOUNT_SLOPE: f64 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct RCAStep {
    pub index: usize,
    pub service: String,
    pub component: String,
    pub time_range_start: DateTime<Utc>,
    pub time_range_end: DateTime<Utc>,
    pub ring: Ring,
    pub direction: GraphDirection,
    pub distance: i64,
    pub evidence: Vec<String>,
    pub summary: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RCAChain {
    pub steps: Vec<RCAStep>,
    pub score: f64,
    pub rank: usize,
    pub impact_path: Vec<String>,
    pub hop_count: usize,
}

fn ring_label(ring: Ring) -> &'static str {
    match ring {
        Ring::R1Immediate => "R1_IMMEDIATE",
        Ring::R2Short => "R2_SHORT",
        Ring::R3Medium => "R3_MEDIUM",
        Ring::R4Long => "R4_LONG",
        Ring::ROutOfScope => "R_OUT_OF_SCOPE",
    }
}

fn direction_label(direction: GraphDirection) -> &'static str {
    match direction {
        GraphDirection::Upstream => "upstream",
        GraphDirection::Downstream => "downstream",
        GraphDirection::Same => "same",
        GraphDirection::Unknown => "unknown",
    }
}

fn evidence_for(group: &crate::grouping::AnomalyGroup) -> Vec<String> {
    let mut evidence: Vec<String> = group
        .events
        .iter()
        .map(|e| format!("{}:{}", e.event.metric_name, e.event.source_id))
        .collect();
    evidence.sort();
    evidence.dedup();
    evidence
}

fn same_service_summary(index: usize, service: &str, component: &str, ring: Ring) -> String {
    format!("Why {index}: {service} experienced anomalies in {component} within {}.", ring_label(ring))
}

#[allow(clippy::too_many_arguments)]
fn upstream_summary(
    index: usize,
    service: &str,
    component: &str,
    at: DateTime<Utc>,
    ring: Ring,
    direction: GraphDirection,
    distance: i64,
    impact_service: &str,
    evidence_count: usize,
) -> String {
    format!(
        "Why {index}: {service} ({component}) at {} showed anomalies ({}, {}, {distance} hops away). This likely caused failures in {impact_service}. Evidence: {evidence_count}",
        at.format("%H:%M:%S"),
        ring_label(ring),
        direction_label(direction),
    )
}

fn append_reduced_accuracy_note(summary: String, diagnostics: &Diagnostics) -> String {
    if diagnostics.has_significant_issues() {
        format!("{summary} [Note: RCA accuracy may be reduced due to missing metrics labels or configuration issues.]")
    } else {
        summary
    }
}

pub struct ChainBuilder;

impl ChainBuilder {
    /// Build one chain from `candidate`. Step 1 is the candidate itself;
    /// if the candidate's service differs from `impact_service`, the
    /// shortest path between them supplies one step per intermediate hop,
    /// each scored from the traversed edge's error rate (0 if the edge is
    /// absent). The path is walked candidate-to-impact when the candidate
    /// calls toward the impact, and impact-to-candidate reversed when the
    /// candidate sits downstream of it (the impact calls toward it) — a
    /// missing path in both directions yields a single-step chain rather
    /// than an error (spec.md §4.6 failure semantics).
    pub fn build(
        candidate: &CandidateCause,
        graph: &ServiceGraph,
        impact_service: &str,
        max_steps_per_chain: usize,
        diagnostics: &Diagnostics,
    ) -> Result<RCAChain, ChainError> {
        let group = &candidate.group;
        let component = group.component.clone().unwrap_or_default();
        let evidence = evidence_for(group);

        let first_summary = if group.service == impact_service {
            same_service_summary(1, &group.service, &component, group.ring)
        } else {
            upstream_summary(
                1,
                &group.service,
                &component,
                group.time_range_start,
                group.ring,
                group.dominant_direction,
                group.min_distance,
                impact_service,
                evidence.len(),
            )
        };

        let mut steps = vec![RCAStep {
            index: 1,
            service: group.service.clone(),
            component,
            time_range_start: group.time_range_start,
            time_range_end: group.time_range_end,
            ring: group.ring,
            direction: group.dominant_direction,
            distance: group.min_distance,
            evidence,
            summary: append_reduced_accuracy_note(first_summary, diagnostics),
            score: candidate.score,
        }];

        if group.service != impact_service {
            // The candidate may sit upstream of the impact (it calls toward
            // it) or downstream (the impact calls toward it, e.g. a database
            // several hops below a gateway). `shortest_path` only walks
            // forward along call edges, so try the candidate-to-impact
            // direction first and fall back to impact-to-candidate, reversed,
            // when the candidate is the one being called.
            let path = match graph.shortest_path(&group.service, impact_service)? {
                Some(path) => Some(path),
                None => graph.shortest_path(impact_service, &group.service)?.map(|mut p| {
                    p.reverse();
                    p
                }),
            };

            if let Some(path) = path {
                for (i, service) in path.iter().enumerate().skip(1) {
                    if steps.len() >= max_steps_per_chain {
                        break;
                    }
                    let prev = &path[i - 1];
                    let edge_score = graph
                        .get_edge(prev, service)?
                        .or(graph.get_edge(service, prev)?)
                        .map(|e| e.error_rate)
                        .unwrap_or(0.0);

                    let index = steps.len() + 1;
                    let summary = upstream_summary(
                        index,
                        service,
                        "",
                        group.time_range_end,
                        Ring::R2Short,
                        GraphDirection::Upstream,
                        i as i64,
                        impact_service,
                        0,
                    );

                    steps.push(RCAStep {
                        index,
                        service: service.clone(),
                        component: String::new(),
                        time_range_start: group.time_range_end,
                        time_range_end: group.time_range_end,
                        ring: Ring::R2Short,
                        direction: GraphDirection::Upstream,
                        distance: i as i64,
                        evidence: Vec::new(),
                        summary: append_reduced_accuracy_note(summary, diagnostics),
                        score: edge_score,
                    });
                }
            }
        }

        let impact_path = steps.iter().map(|s| s.service.clone()).collect();
        let hop_count = steps.len().saturating_sub(1);
        let mean_step_score = steps.iter().map(|s| s.score).sum::<f64>() / steps.len() as f64;
        let length_discount =
            (1.0 - LENGTH_DISCOUNT_SLOPE * steps.len() as f64 / max_steps_per_chain.max(1) as f64)
                .max(LENGTH_DISCOUNT_FLOOR);
        let score = (mean_step_score * length_discount).clamp(0.0, 1.0);

        Ok(RCAChain {
            steps,
            score,
            rank: 0,
            impact_path,
            hop_count,
        })
    }

    /// Sort chains descending by score and assign sequential ranks.
    pub fn rank_chains(chains: &mut [RCAChain]) {
        chains.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        for (i, chain) in chains.iter_mut().enumerate() {
            chain.rank = i + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::DetailedScore;
    use rca_core::ServiceEdge;
    use std::collections::BTreeMap;

    fn candidate(service: &str) -> CandidateCause {
        CandidateCause {
            group: crate::grouping::AnomalyGroup {
                service: service.to_string(),
                component: Some("read-path".to_string()),
                ring: Ring::R1Immediate,
                bucket: Utc::now(),
                events: Vec::new(),
                event_count: 1,
                distinct_transaction_count: 1,
                max_severity: 0.75,
                avg_severity: 0.75,
                max_anomaly_score: 0.9,
                avg_anomaly_score: 0.9,
                dominant_direction: GraphDirection::Upstream,
                min_distance: 3,
                max_distance: 3,
                time_range_start: Utc::now(),
                time_range_end: Utc::now(),
                dimension_values: BTreeMap::new(),
            },
            score: 0.8,
            rank: 1,
            reasons: vec![],
            detailed_score: DetailedScore {
                ring_score: 1.0,
                direction_score: 1.0,
                distance_score: 0.25,
                severity_score: 0.75,
                anomaly_score_score: 0.9,
                transaction_count_score: 0.1,
                dimension_alignment_score: None,
                dimension_alignment_records: vec![],
            },
        }
    }

    fn chain_graph() -> ServiceGraph {
        let graph = ServiceGraph::new();
        graph.add_edge(ServiceEdge::new("api-gw", "tps")).unwrap();
        graph.add_edge(ServiceEdge::new("tps", "kafka")).unwrap();
        let mut edge = ServiceEdge::new("kafka", "cassandra");
        edge.request_count = 100;
        edge.failure_count = 20;
        edge.recompute_error_rate();
        graph.add_edge(edge).unwrap();
        graph
    }

    #[test]
    fn same_service_candidate_yields_single_step() {
        let graph = chain_graph();
        let diag = Diagnostics::new();
        let chain = ChainBuilder::build(&candidate("api-gw"), &graph, "api-gw", 10, &diag).unwrap();
        assert_eq!(chain.steps.len(), 1);
        assert_eq!(chain.hop_count, 0);
        assert_eq!(chain.steps[0].direction, GraphDirection::Upstream);
    }

    #[test]
    fn upstream_candidate_walks_path_to_impact() {
        let graph = chain_graph();
        let diag = Diagnostics::new();
        let chain = ChainBuilder::build(&candidate("cassandra"), &graph, "api-gw", 10, &diag).unwrap();
        assert_eq!(chain.impact_path, vec!["cassandra", "kafka", "tps", "api-gw"]);
        assert_eq!(chain.hop_count, 3);
        assert!(chain.steps[1].score > 0.0);
    }

    #[test]
    fn missing_path_falls_back_to_single_step_chain() {
        let graph = ServiceGraph::new();
        graph.add_edge(ServiceEdge::new("svc-a", "svc-b")).unwrap();
        let diag = Diagnostics::new();
        let chain = ChainBuilder::build(&candidate("unrelated-svc"), &graph, "api-gw", 10, &diag).unwrap();
        assert_eq!(chain.steps.len(), 1);
    }

    #[test]
    fn length_discount_floor_holds() {
        let graph = chain_graph();
        let diag = Diagnostics::new();
        let chain = ChainBuilder::build(&candidate("cassandra"), &graph, "api-gw", 2, &diag).unwrap();
        let mean: f64 = chain.steps.iter().map(|s| s.score).sum::<f64>() / chain.steps.len() as f64;
        assert!(chain.score >= 0.5 * mean - 1e-9);
    }

    #[test]
    fn ranking_assigns_sequential_ranks_descending_by_score() {
        let mut chains = vec![
            RCAChain {
                steps: vec![],
                score: 0.4,
                rank: 0,
                impact_path: vec![],
                hop_count: 0,
            },
            RCAChain {
                steps: vec![],
                score: 0.9,
                rank: 0,
                impact_path: vec![],
                hop_count: 0,
            },
        ];
        ChainBuilder::rank_chains(&mut chains);
        assert_eq!(chains[0].score, 0.9);
        assert_eq!(chains[0].rank, 1);
        assert_eq!(chains[1].rank, 2);
    }
}
