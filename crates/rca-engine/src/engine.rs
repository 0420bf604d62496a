//! RCA engine (C10) — the top-level entry point: validates the incident,
//! runs the candidate-cause pipeline, builds chains, and emits one
//! `RCAIncident`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rca_core::{Diagnostics, IncidentContext, ServiceGraph};

use crate::candidate::CandidateCauseService;
use crate::chain::{ChainBuilder, RCAChain, RCAStep};
use crate::config::{merge_options, RCAOptions};
use crate::correlation::{select_focal_service, synthesize_template_chains, CorrelationEngine, TimeRange};
use crate::error::RcaError;
use crate::provider::AnomalyEventsProvider;
use crate::scoring::ScoringEngine;

#[derive(Debug, Clone, PartialEq)]
pub struct RCAIncident {
    pub incident_id: String,
    pub focal_service: String,
    pub chains: Vec<RCAChain>,
    pub root_cause: Option<RCAStep>,
    pub overall_score: f64,
    pub generated_at: DateTime<Utc>,
    pub notes: Vec<String>,
}

pub struct RCAEngine<'a, P: AnomalyEventsProvider, C: CorrelationEngine> {
    provider: &'a P,
    graph: &'a ServiceGraph,
    correlation: &'a C,
    defaults: RCAOptions,
}

impl<'a, P: AnomalyEventsProvider, C: CorrelationEngine> RCAEngine<'a, P, C> {
    pub fn new(provider: &'a P, graph: &'a ServiceGraph, correlation: &'a C, defaults: RCAOptions) -> Self {
        Self {
            provider,
            graph,
            correlation,
            defaults,
        }
    }

    /// `ComputeRCA`: validate, collect/group/score candidates, build and
    /// rank chains, emit a result carrying all diagnostics notes. Only
    /// incident validation and anomaly-provider failures are fatal here —
    /// everything else degrades into a note or a skipped chain.
    pub async fn compute_rca(
        &self,
        incident: &IncidentContext,
        overrides: Option<RCAOptions>,
        generated_at: DateTime<Utc>,
    ) -> Result<RCAIncident, RcaError> {
        incident.validate()?;
        let options = merge_options(&self.defaults, overrides)?;

        let mut diagnostics = Diagnostics::new();
        let service = CandidateCauseService::new(self.provider, self.graph);
        let mut candidates = service.run(incident, &options, &mut diagnostics).await?;

        if candidates.is_empty() {
            diagnostics.add_note("No anomalies found to explain the incident");
            return Ok(RCAIncident {
                incident_id: incident.id.clone(),
                focal_service: incident.impact_service.clone(),
                chains: Vec::new(),
                root_cause: None,
                overall_score: 0.0,
                generated_at,
                notes: diagnostics.to_notes(),
            });
        }

        if !options.dimensions.dimensions.is_empty() {
            let impact_dimension_values: BTreeMap<String, String> = candidates
                .iter()
                .find(|c| c.group.service == incident.impact_service)
                .map(|c| c.group.dimension_values.clone())
                .unwrap_or_default();
            ScoringEngine::apply_dimension_alignment(
                &mut candidates,
                &impact_dimension_values,
                &options.dimensions,
                &mut diagnostics,
            );
        }

        if let Some(kpi) = &incident.kpi {
            ScoringEngine::apply_kpi_sentiment_bias(&mut candidates, Some(kpi), 0.05, &mut diagnostics);
        }

        let before_threshold = candidates.len();
        candidates.retain(|c| c.score >= options.min_score_threshold);
        if candidates.len() < before_threshold {
            diagnostics.add_note(format!(
                "{} candidate(s) scored below min_score_threshold ({:.2}) and were dropped",
                before_threshold - candidates.len(),
                options.min_score_threshold
            ));
        }

        let mut chains: Vec<RCAChain> = Vec::new();
        for candidate in candidates.iter().take(options.max_chains) {
            match ChainBuilder::build(
                candidate,
                self.graph,
                &incident.impact_service,
                options.max_steps_per_chain,
                &diagnostics,
            ) {
                Ok(chain) => chains.push(chain),
                Err(e) => {
                    tracing::warn!(service = %candidate.group.service, error = %e, "chain build failed, skipping candidate");
                }
            }
        }

        ChainBuilder::rank_chains(&mut chains);

        let root_cause = chains.first().and_then(|c| c.steps.last().cloned());
        let overall_score = chains.first().map(|c| c.score).unwrap_or(0.0);

        Ok(RCAIncident {
            incident_id: incident.id.clone(),
            focal_service: incident.impact_service.clone(),
            chains,
            root_cause,
            overall_score,
            generated_at,
            notes: diagnostics.to_notes(),
        })
    }

    /// `ComputeRCAByTimeRange`: delegates to the correlation engine and
    /// synthesizes template chains rather than running the full
    /// collect/group/score pipeline.
    pub async fn compute_rca_by_time_range(
        &self,
        range: TimeRange,
        generated_at: DateTime<Utc>,
    ) -> Result<RCAIncident, RcaError> {
        let result = self.correlation.correlate(range).await?;
        let focal_service = select_focal_service(&result);

        let mut chains = synthesize_template_chains(&result, generated_at);
        ChainBuilder::rank_chains(&mut chains);

        let mut notes = Vec::new();
        if result.causes.is_empty() && result.red_anchors.is_empty() && result.affected_services.is_empty() {
            notes.push("No candidates found from the correlation engine".to_string());
        }
        notes.extend(result.recommendations.clone());

        let root_cause = chains.first().and_then(|c| c.steps.last().cloned());
        let overall_score = chains.first().map(|c| c.score).unwrap_or(0.0);

        Ok(RCAIncident {
            incident_id: format!("tr-{}-{}", range.start.timestamp(), range.end.timestamp()),
            focal_service,
            chains,
            root_cause,
            overall_score,
            generated_at,
            notes,
        })
    }
}
