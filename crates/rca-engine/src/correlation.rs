//! Correlation-engine collaborator and the template-chain variant of RCA
//! it feeds (spec.md §4.6 "Alternative time-range entry point").

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rca_core::{GraphDirection, Ring};

use crate::chain::{RCAChain, RCAStep};
use crate::error::CorrelationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// One externally-identified candidate cause, carrying its own suspicion
/// score rather than a group derived from C6/C7.
#[derive(Debug, Clone, PartialEq)]
pub struct Cause {
    pub service: String,
    pub description: String,
    pub suspicion_score: f64,
}

/// A metric+service+score pair seeding template chain construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RedAnchor {
    pub service: String,
    pub metric: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CorrelationResult {
    pub causes: Vec<Cause>,
    pub red_anchors: Vec<RedAnchor>,
    pub confidence: f64,
    pub affected_services: Vec<String>,
    pub recommendations: Vec<String>,
}

#[async_trait]
pub trait CorrelationEngine: Send + Sync {
    async fn correlate(&self, range: TimeRange) -> Result<CorrelationResult, CorrelationError>;
}

/// First affected service, else the highest-suspicion cause's service,
/// else the first red anchor's service, else `"unknown"` (spec.md §4.6).
pub fn select_focal_service(result: &CorrelationResult) -> String {
    if let Some(service) = result.affected_services.first() {
        return service.clone();
    }
    if let Some(cause) = result
        .causes
        .iter()
        .max_by(|a, b| a.suspicion_score.partial_cmp(&b.suspicion_score).unwrap_or(std::cmp::Ordering::Equal))
    {
        return cause.service.clone();
    }
    if let Some(anchor) = result.red_anchors.first() {
        return anchor.service.clone();
    }
    "unknown".to_string()
}

const ANCHOR_CHAIN_MULTIPLIERS: [f64; 3] = [1.0, 0.7, 0.5];

/// Synthesizes up to three fixed-shape template chains, one per top red
/// anchor (business impact -> anchor service -> dependency -> infra ->
/// process), with per-chain score `multiplier * anchor.score`.
pub fn synthesize_template_chains(result: &CorrelationResult, generated_at: DateTime<Utc>) -> Vec<RCAChain> {
    let mut anchors: Vec<&RedAnchor> = result.red_anchors.iter().collect();
    anchors.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    anchors
        .into_iter()
        .take(ANCHOR_CHAIN_MULTIPLIERS.len())
        .enumerate()
        .map(|(i, anchor)| {
            let multiplier = ANCHOR_CHAIN_MULTIPLIERS[i];
            let labels = [
                "business-impact".to_string(),
                anchor.service.clone(),
                format!("{}-dependency", anchor.service),
                format!("{}-infra", anchor.service),
                "process".to_string(),
            ];
            let steps: Vec<RCAStep> = labels
                .into_iter()
                .enumerate()
                .map(|(idx, service)| RCAStep {
                    index: idx + 1,
                    service: service.clone(),
                    component: anchor.metric.clone(),
                    time_range_start: generated_at,
                    time_range_end: generated_at,
                    ring: Ring::R2Short,
                    direction: GraphDirection::Upstream,
                    distance: idx as i64,
                    evidence: vec![anchor.metric.clone()],
                    summary: format!(
                        "Why {}: {service} implicated by red anchor '{}' (score {:.2}).",
                        idx + 1,
                        anchor.metric,
                        anchor.score
                    ),
                    score: anchor.score * multiplier,
                })
                .collect();
            let impact_path = steps.iter().map(|s| s.service.clone()).collect();
            let hop_count = steps.len().saturating_sub(1);
            RCAChain {
                steps,
                score: (anchor.score * multiplier).clamp(0.0, 1.0),
                rank: 0,
                impact_path,
                hop_count,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focal_service_prefers_affected_services() {
        let result = CorrelationResult {
            affected_services: vec!["checkout".to_string()],
            causes: vec![Cause {
                service: "payments".to_string(),
                description: "".to_string(),
                suspicion_score: 0.9,
            }],
            ..Default::default()
        };
        assert_eq!(select_focal_service(&result), "checkout");
    }

    #[test]
    fn focal_service_falls_back_to_highest_suspicion_cause() {
        let result = CorrelationResult {
            causes: vec![
                Cause {
                    service: "payments".to_string(),
                    description: "".to_string(),
                    suspicion_score: 0.4,
                },
                Cause {
                    service: "cassandra".to_string(),
                    description: "".to_string(),
                    suspicion_score: 0.9,
                },
            ],
            ..Default::default()
        };
        assert_eq!(select_focal_service(&result), "cassandra");
    }

    #[test]
    fn focal_service_falls_back_to_red_anchor_then_unknown() {
        let with_anchor = CorrelationResult {
            red_anchors: vec![RedAnchor {
                service: "kafka".to_string(),
                metric: "consumer_lag".to_string(),
                score: 0.8,
            }],
            ..Default::default()
        };
        assert_eq!(select_focal_service(&with_anchor), "kafka");
        assert_eq!(select_focal_service(&CorrelationResult::default()), "unknown");
    }

    #[test]
    fn template_chains_scale_by_anchor_rank() {
        let result = CorrelationResult {
            red_anchors: vec![
                RedAnchor {
                    service: "a".to_string(),
                    metric: "m1".to_string(),
                    score: 1.0,
                },
                RedAnchor {
                    service: "b".to_string(),
                    metric: "m2".to_string(),
                    score: 0.5,
                },
            ],
            ..Default::default()
        };
        let chains = synthesize_template_chains(&result, Utc::now());
        assert_eq!(chains.len(), 2);
        assert!((chains[0].score - 1.0).abs() < 1e-9);
        assert!((chains[1].score - 0.35).abs() < 1e-9);
        assert_eq!(chains[0].steps.len(), 5);
    }

    #[test]
    fn empty_correlation_yields_no_template_chains() {
        let chains = synthesize_template_chains(&CorrelationResult::default(), Utc::now());
        assert!(chains.is_empty());
    }
}
