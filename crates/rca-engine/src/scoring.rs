//! Scoring & ranking (C8) — weighted multi-dimensional score, deterministic
//! tie-break, optional dimension alignment and KPI-sentiment bias.

use std::collections::BTreeMap;

use rca_core::{Diagnostics, GraphDirection, KpiMetadata, KpiSentiment, Ring};

use crate::config::{RCADimensionConfig, ScoringConfig};
use crate::grouping::AnomalyGroup;

/// Fixed blend weight combining the base score with dimension alignment
/// (spec.md §4.5 — not user-configurable).
const ALIGNMENT_BLEND_WEIGHT: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct DimensionAlignmentRecord {
    pub name: String,
    pub impact_value: Option<String>,
    pub candidate_value: Option<String>,
    pub aligned: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailedScore {
    pub ring_score: f64,
    pub direction_score: f64,
    pub distance_score: f64,
    pub severity_score: f64,
    pub anomaly_score_score: f64,
    pub transaction_count_score: f64,
    pub dimension_alignment_score: Option<f64>,
    pub dimension_alignment_records: Vec<DimensionAlignmentRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateCause {
    pub group: AnomalyGroup,
    pub score: f64,
    pub rank: usize,
    pub reasons: Vec<String>,
    pub detailed_score: DetailedScore,
}

fn score_ring(ring: Ring) -> f64 {
    match ring {
        Ring::R1Immediate => 1.0,
        Ring::R2Short => 0.75,
        Ring::R3Medium => 0.5,
        Ring::R4Long => 0.25,
        Ring::ROutOfScope => 0.0,
    }
}

fn score_direction(direction: GraphDirection) -> f64 {
    match direction {
        GraphDirection::Upstream => 1.0,
        GraphDirection::Same => 0.8,
        GraphDirection::Unknown => 0.5,
        GraphDirection::Downstream => 0.3,
    }
}

fn score_distance(min_distance: i64) -> f64 {
    if min_distance < 0 {
        0.3
    } else if min_distance == 0 {
        1.0
    } else {
        1.0 / (1.0 + min_distance as f64)
    }
}

fn score_transaction_count(count: usize) -> f64 {
    let score = ((count + 1) as f64).ln() / 1001.0_f64.ln();
    score.min(1.0)
}

fn reasons_for(detail: &DetailedScore, direction: GraphDirection, min_distance: i64) -> Vec<String> {
    let mut reasons = Vec::new();
    if detail.ring_score >= 0.75 {
        reasons.push("ring_immediate_or_short".to_string());
    }
    if detail.direction_score >= 0.8 {
        if direction == GraphDirection::Upstream {
            reasons.push("upstream_dependency".to_string());
        } else {
            reasons.push("same_service_impact".to_string());
        }
    }
    if min_distance == 0 {
        reasons.push("direct_impact_target".to_string());
    }
    if detail.severity_score >= 0.75 {
        reasons.push("high_severity".to_string());
    }
    if detail.anomaly_score_score >= 0.75 {
        reasons.push("high_anomaly_score".to_string());
    }
    if detail.transaction_count_score >= 0.5 {
        reasons.push("broad_impact".to_string());
    }
    reasons
}

pub struct ScoringEngine;

impl ScoringEngine {
    /// Score every group and return a ranked list of candidates. Ranking
    /// is by score descending with a deterministic (service, component)
    /// ascending tie-break; ranks are assigned sequentially starting at 1.
    pub fn score_and_rank(groups: Vec<AnomalyGroup>, config: &ScoringConfig) -> Vec<CandidateCause> {
        let weight_sum = config.weight_sum();
        let mut candidates: Vec<CandidateCause> = groups
            .into_iter()
            .map(|group| {
                let ring_score = score_ring(group.ring);
                let direction_score = score_direction(group.dominant_direction);
                let distance_score = score_distance(group.min_distance);
                let severity_score = group.max_severity;
                let anomaly_score_score = group.max_anomaly_score;
                let transaction_count_score = score_transaction_count(group.distinct_transaction_count);

                let total = if weight_sum > 0.0 {
                    (config.ring_weight * ring_score
                        + config.direction_weight * direction_score
                        + config.distance_weight * distance_score
                        + config.severity_weight * severity_score
                        + config.anomaly_score_weight * anomaly_score_score
                        + config.transaction_count_weight * transaction_count_score)
                        / weight_sum
                } else {
                    0.0
                };

                let detail = DetailedScore {
                    ring_score,
                    direction_score,
                    distance_score,
                    severity_score,
                    anomaly_score_score,
                    transaction_count_score,
                    dimension_alignment_score: None,
                    dimension_alignment_records: Vec::new(),
                };
                let reasons = reasons_for(&detail, group.dominant_direction, group.min_distance);

                CandidateCause {
                    group,
                    score: total.clamp(0.0, 1.0),
                    rank: 0,
                    reasons,
                    detailed_score: detail,
                }
            })
            .collect();

        Self::sort_and_rank(&mut candidates);

        if config.max_candidates_to_return > 0 {
            candidates.truncate(config.max_candidates_to_return);
        }

        candidates
    }

    fn sort_and_rank(candidates: &mut [CandidateCause]) {
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.group.service.cmp(&b.group.service))
                .then_with(|| a.group.component.cmp(&b.group.component))
        });
        for (i, candidate) in candidates.iter_mut().enumerate() {
            candidate.rank = i + 1;
        }
    }

    /// Compare each candidate's observed dimension values against the
    /// impact service's, blend the alignment score into the base score at
    /// a fixed 5% weight, then resort and rerank.
    pub fn apply_dimension_alignment(
        candidates: &mut Vec<CandidateCause>,
        impact_dimension_values: &BTreeMap<String, String>,
        dimensions: &RCADimensionConfig,
        diagnostics: &mut Diagnostics,
    ) {
        if dimensions.dimensions.is_empty() {
            return;
        }
        let weight_sum: f64 = dimensions.dimensions.iter().map(|d| d.weight).sum();

        for candidate in candidates.iter_mut() {
            let mut contribution = 0.0;
            let mut records = Vec::with_capacity(dimensions.dimensions.len());

            for dim in &dimensions.dimensions {
                let impact_value = impact_dimension_values.get(&dim.name);
                let candidate_value = candidate.group.dimension_values.get(&dim.name);
                let aligned = match (impact_value, candidate_value) {
                    (Some(i), Some(c)) => {
                        if i == c {
                            contribution += dim.weight * dimensions.alignment_bonus;
                            Some(true)
                        } else {
                            contribution -= dim.weight * dimensions.alignment_penalty;
                            Some(false)
                        }
                    }
                    _ => {
                        diagnostics.add_dimension_miss(dim.name.clone());
                        None
                    }
                };
                records.push(DimensionAlignmentRecord {
                    name: dim.name.clone(),
                    impact_value: impact_value.cloned(),
                    candidate_value: candidate_value.cloned(),
                    aligned,
                });
            }

            let alignment = if weight_sum > 0.0 { contribution / weight_sum } else { 0.0 };
            candidate.detailed_score.dimension_alignment_score = Some(alignment);
            candidate.detailed_score.dimension_alignment_records = records;
            candidate.score =
                (candidate.score * (1.0 - ALIGNMENT_BLEND_WEIGHT) + alignment * ALIGNMENT_BLEND_WEIGHT)
                    .clamp(0.0, 1.0);
        }

        Self::sort_and_rank(candidates);
    }

    /// Applies a flat bias to every candidate's score when the incident's
    /// impact signal is a business KPI (spec.md §4.5). No-op for
    /// `KpiSentiment::Neutral` or when `kpi` is absent.
    pub fn apply_kpi_sentiment_bias(
        candidates: &mut Vec<CandidateCause>,
        kpi: Option<&KpiMetadata>,
        bias: f64,
        diagnostics: &mut Diagnostics,
    ) {
        let Some(kpi) = kpi else { return };
        if !kpi.impact_is_kpi {
            return;
        }

        let delta = match kpi.sentiment {
            KpiSentiment::Negative => bias,
            KpiSentiment::Positive => -bias,
            KpiSentiment::Neutral => 0.0,
        };
        if delta == 0.0 {
            return;
        }

        for candidate in candidates.iter_mut() {
            candidate.score = (candidate.score + delta).clamp(0.0, 1.0);
        }
        diagnostics.add_note(format!(
            "KPI-sentiment bias ({:?}, {delta:+.2}) applied to all candidates",
            kpi.sentiment
        ));

        Self::sort_and_rank(candidates);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rca_core::GraphDirection;

    fn group(service: &str, ring: Ring, direction: GraphDirection, distance: i64, severity: f64) -> AnomalyGroup {
        AnomalyGroup {
            service: service.to_string(),
            component: Some("comp".to_string()),
            ring,
            bucket: Utc::now(),
            events: Vec::new(),
            event_count: 1,
            distinct_transaction_count: 1,
            max_severity: severity,
            avg_severity: severity,
            max_anomaly_score: 0.8,
            avg_anomaly_score: 0.8,
            dominant_direction: direction,
            min_distance: distance,
            max_distance: distance,
            time_range_start: Utc::now(),
            time_range_end: Utc::now(),
            dimension_values: BTreeMap::new(),
        }
    }

    #[test]
    fn ranking_is_deterministic_on_ties() {
        let groups = vec![
            group("zeta", Ring::R1Immediate, GraphDirection::Same, 0, 0.5),
            group("alpha", Ring::R1Immediate, GraphDirection::Same, 0, 0.5),
        ];
        let ranked = ScoringEngine::score_and_rank(groups, &ScoringConfig::default());
        assert_eq!(ranked[0].group.service, "alpha");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn scores_are_bounded() {
        let groups = vec![group("svc", Ring::R1Immediate, GraphDirection::Upstream, 0, 1.0)];
        let ranked = ScoringEngine::score_and_rank(groups, &ScoringConfig::default());
        assert!(ranked[0].score <= 1.0);
        assert!(ranked[0].score >= 0.0);
    }

    #[test]
    fn kpi_negative_bias_reorders_candidates_per_scenario_4() {
        let mut candidates = vec![
            CandidateCause {
                group: group("svc1", Ring::R3Medium, GraphDirection::Unknown, -1, 0.3),
                score: 0.3,
                rank: 1,
                reasons: vec![],
                detailed_score: DetailedScore {
                    ring_score: 0.0,
                    direction_score: 0.0,
                    distance_score: 0.0,
                    severity_score: 0.0,
                    anomaly_score_score: 0.0,
                    transaction_count_score: 0.0,
                    dimension_alignment_score: None,
                    dimension_alignment_records: vec![],
                },
            },
            CandidateCause {
                group: group("svc2", Ring::R3Medium, GraphDirection::Unknown, -1, 0.5),
                score: 0.5,
                rank: 2,
                reasons: vec![],
                detailed_score: DetailedScore {
                    ring_score: 0.0,
                    direction_score: 0.0,
                    distance_score: 0.0,
                    severity_score: 0.0,
                    anomaly_score_score: 0.0,
                    transaction_count_score: 0.0,
                    dimension_alignment_score: None,
                    dimension_alignment_records: vec![],
                },
            },
        ];
        let kpi = KpiMetadata {
            name: "checkout_conversion".to_string(),
            sentiment: KpiSentiment::Negative,
            impact_is_kpi: true,
        };
        let mut diag = Diagnostics::new();
        ScoringEngine::apply_kpi_sentiment_bias(&mut candidates, Some(&kpi), 0.3, &mut diag);

        assert_eq!(candidates[0].group.service, "svc2");
        assert!((candidates[0].score - 0.8).abs() < 1e-9);
        assert_eq!(candidates[0].rank, 1);
        assert_eq!(candidates[1].group.service, "svc1");
        assert!((candidates[1].score - 0.6).abs() < 1e-9);
        assert_eq!(candidates[1].rank, 2);
    }

    #[test]
    fn dimension_misalignment_matches_scenario_5() {
        let mut candidates = vec![CandidateCause {
            group: {
                let mut g = group("svc1", Ring::R1Immediate, GraphDirection::Upstream, 1, 0.5);
                g.dimension_values.insert("env".to_string(), "prod".to_string());
                g.dimension_values.insert("region".to_string(), "us-west-1".to_string());
                g
            },
            score: 0.5,
            rank: 1,
            reasons: vec![],
            detailed_score: DetailedScore {
                ring_score: 0.0,
                direction_score: 0.0,
                distance_score: 0.0,
                severity_score: 0.0,
                anomaly_score_score: 0.0,
                transaction_count_score: 0.0,
                dimension_alignment_score: None,
                dimension_alignment_records: vec![],
            },
        }];
        let mut impact_dims = BTreeMap::new();
        impact_dims.insert("env".to_string(), "prod".to_string());
        impact_dims.insert("region".to_string(), "us-east-1".to_string());

        let dim_config = RCADimensionConfig {
            dimensions: vec![
                crate::config::DimensionSpec {
                    name: "env".to_string(),
                    weight: 0.1,
                },
                crate::config::DimensionSpec {
                    name: "region".to_string(),
                    weight: 0.2,
                },
            ],
            alignment_penalty: 0.2,
            alignment_bonus: 0.1,
        };
        let mut diag = Diagnostics::new();
        ScoringEngine::apply_dimension_alignment(&mut candidates, &impact_dims, &dim_config, &mut diag);

        let alignment = candidates[0].detailed_score.dimension_alignment_score.unwrap();
        assert!((alignment - (-0.1)).abs() < 1e-9);
    }
}
