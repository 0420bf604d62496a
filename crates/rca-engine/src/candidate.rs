//! Candidate-cause service (C9) — orchestrates the collector, grouping
//! engine and scorer into one ranked candidate list.

use rca_core::{Diagnostics, IncidentContext, ServiceGraph};

use crate::collector::AnomalyCollector;
use crate::config::RCAOptions;
use crate::error::CollectError;
use crate::grouping::GroupingEngine;
use crate::provider::AnomalyEventsProvider;
use crate::scoring::{CandidateCause, ScoringEngine};

pub struct CandidateCauseService<'a, P: AnomalyEventsProvider> {
    collector: AnomalyCollector<'a, P>,
}

impl<'a, P: AnomalyEventsProvider> CandidateCauseService<'a, P> {
    pub fn new(provider: &'a P, graph: &'a ServiceGraph) -> Self {
        Self {
            collector: AnomalyCollector::new(provider, graph),
        }
    }

    pub async fn run(
        &self,
        incident: &IncidentContext,
        options: &RCAOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<CandidateCause>, CollectError> {
        let enriched = self
            .collector
            .collect(incident, &options.collect, diagnostics)
            .await?;

        let dimension_names: Vec<String> = options
            .dimensions
            .dimensions
            .iter()
            .map(|d| d.name.clone())
            .collect();

        let groups = GroupingEngine::group(&enriched, &options.grouping, &dimension_names, diagnostics);
        Ok(ScoringEngine::score_and_rank(groups, &options.scoring))
    }
}
