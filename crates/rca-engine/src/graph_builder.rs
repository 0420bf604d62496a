//! Service-Graph Builder (C3) — populates a [`ServiceGraph`] by querying
//! a [`MetricsQuerier`] for request/failure/latency counters over a
//! window.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rca_core::{Diagnostics, ServiceEdge, ServiceGraph};

use crate::error::CollectError;
use crate::label::{LabelAlternates, LabelDetector};
use crate::querier::{MetricsQLQueryRequest, MetricsQuerier};

const REQUEST_TOTAL_METRIC: &str = "traces_service_graph_request_total";
const FAILED_TOTAL_METRIC: &str = "traces_service_graph_request_failed_total";
const SERVER_SUM_METRIC: &str = "traces_service_graph_request_server_sum";
const SERVER_COUNT_METRIC: &str = "traces_service_graph_request_server_count";

#[derive(Default)]
struct EdgeAccumulator {
    request_count: u64,
    failure_count: u64,
    latency_sum_ms: f64,
    latency_count: u64,
    attributes: HashMap<String, String>,
}

pub struct ServiceGraphBuilder<'a, Q: MetricsQuerier> {
    querier: &'a Q,
    label_detector: LabelDetector,
}

impl<'a, Q: MetricsQuerier> ServiceGraphBuilder<'a, Q> {
    pub fn new(querier: &'a Q) -> Self {
        Self {
            querier,
            label_detector: LabelDetector::new(LabelAlternates::new()),
        }
    }

    /// Populate `graph` for `tenant_id` over `[start, end]`. Never fails
    /// the whole request if one metric query errors — the error is
    /// logged and recorded in `diagnostics`, and the builder continues
    /// with whatever the other three queries returned (spec.md §4.3).
    pub async fn build(
        &self,
        graph: &ServiceGraph,
        tenant_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), CollectError> {
        if end <= start {
            return Err(CollectError::Provider(
                crate::error::ProviderError::InvalidWindow,
            ));
        }
        let window_seconds = (end - start).num_seconds().max(1);

        let mut accumulators: HashMap<(String, String), EdgeAccumulator> = HashMap::new();

        self.accumulate_request_total(
            tenant_id,
            window_seconds,
            &mut accumulators,
            diagnostics,
        )
        .await;
        self.accumulate_failed_total(tenant_id, window_seconds, &mut accumulators, diagnostics)
            .await;
        self.accumulate_latency(tenant_id, window_seconds, &mut accumulators, diagnostics)
            .await;

        for ((source, target), acc) in accumulators {
            let mut edge = ServiceEdge::new(source, target);
            edge.request_count = acc.request_count;
            edge.failure_count = acc.failure_count;
            edge.request_rate = acc.request_count as f64 / window_seconds as f64;
            edge.failure_rate = acc.failure_count as f64 / window_seconds as f64;
            edge.recompute_error_rate();
            edge.avg_latency_ms = if acc.latency_count > 0 {
                acc.latency_sum_ms / acc.latency_count as f64
            } else {
                0.0
            };
            edge.attributes = acc.attributes;
            graph.add_edge(edge)?;
        }

        Ok(())
    }

    fn increase_query(&self, tenant_id: &str, metric: &str, window_seconds: i64) -> MetricsQLQueryRequest {
        MetricsQLQueryRequest {
            tenant_id: tenant_id.to_string(),
            expression: format!("increase({metric}[{window_seconds}s])"),
        }
    }

    async fn run_query(
        &self,
        tenant_id: &str,
        metric: &str,
        window_seconds: i64,
        diagnostics: &mut Diagnostics,
    ) -> Vec<crate::querier::MetricsQLSample> {
        let request = self.increase_query(tenant_id, metric, window_seconds);
        match self.querier.execute_query(request).await {
            Ok(result) => result.result,
            Err(e) => {
                tracing::warn!(metric, error = %e, "metrics query failed, continuing with partial graph");
                diagnostics.add_metrics_query_warning(format!("{metric}: {e}"));
                Vec::new()
            }
        }
    }

    fn edge_key(
        &self,
        sample: &crate::querier::MetricsQLSample,
        diagnostics: &mut Diagnostics,
    ) -> Option<(String, String)> {
        let client = self
            .label_detector
            .resolve("client", &sample.metric, diagnostics)?
            .to_string();
        let server = self
            .label_detector
            .resolve("server", &sample.metric, diagnostics)?
            .to_string();
        Some((client, server))
    }

    async fn accumulate_request_total(
        &self,
        tenant_id: &str,
        window_seconds: i64,
        accumulators: &mut HashMap<(String, String), EdgeAccumulator>,
        diagnostics: &mut Diagnostics,
    ) {
        for sample in self
            .run_query(tenant_id, REQUEST_TOTAL_METRIC, window_seconds, diagnostics)
            .await
        {
            let Some(key) = self.edge_key(&sample, diagnostics) else {
                continue;
            };
            if let Some(value) = sample.value_as_f64() {
                accumulators.entry(key).or_default().request_count += value.max(0.0) as u64;
            }
        }
    }

    async fn accumulate_failed_total(
        &self,
        tenant_id: &str,
        window_seconds: i64,
        accumulators: &mut HashMap<(String, String), EdgeAccumulator>,
        diagnostics: &mut Diagnostics,
    ) {
        for sample in self
            .run_query(tenant_id, FAILED_TOTAL_METRIC, window_seconds, diagnostics)
            .await
        {
            let Some(key) = self.edge_key(&sample, diagnostics) else {
                continue;
            };
            if let Some(value) = sample.value_as_f64() {
                accumulators.entry(key).or_default().failure_count += value.max(0.0) as u64;
            }
        }
    }

    async fn accumulate_latency(
        &self,
        tenant_id: &str,
        window_seconds: i64,
        accumulators: &mut HashMap<(String, String), EdgeAccumulator>,
        diagnostics: &mut Diagnostics,
    ) {
        let sums = self
            .run_query(tenant_id, SERVER_SUM_METRIC, window_seconds, diagnostics)
            .await;
        for sample in sums {
            let Some(key) = self.edge_key(&sample, diagnostics) else {
                continue;
            };
            if let Some(value) = sample.value_as_f64() {
                accumulators.entry(key).or_default().latency_sum_ms += value;
            }
        }

        let counts = self
            .run_query(tenant_id, SERVER_COUNT_METRIC, window_seconds, diagnostics)
            .await;
        for sample in counts {
            let Some(key) = self.edge_key(&sample, diagnostics) else {
                continue;
            };
            if let Some(value) = sample.value_as_f64() {
                accumulators.entry(key).or_default().latency_count += value.max(0.0) as u64;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricsQueryError;
    use crate::querier::MetricsQLQueryResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeQuerier {
        responses: Mutex<HashMap<String, Result<MetricsQLQueryResult, String>>>,
    }

    #[async_trait]
    impl MetricsQuerier for FakeQuerier {
        async fn execute_query(
            &self,
            request: MetricsQLQueryRequest,
        ) -> Result<MetricsQLQueryResult, MetricsQueryError> {
            let metric = request
                .expression
                .trim_start_matches("increase(")
                .split('[')
                .next()
                .unwrap()
                .to_string();
            let responses = self.responses.lock().unwrap();
            match responses.get(&metric) {
                Some(Ok(result)) => Ok(result.clone()),
                Some(Err(msg)) => Err(MetricsQueryError::QueryFailed(msg.clone())),
                None => Ok(MetricsQLQueryResult {
                    result_type: "vector".to_string(),
                    result: vec![],
                }),
            }
        }
    }

    fn sample(client: &str, server: &str, value: &str) -> crate::querier::MetricsQLSample {
        let mut metric = HashMap::new();
        metric.insert("client".to_string(), client.to_string());
        metric.insert("server".to_string(), server.to_string());
        crate::querier::MetricsQLSample {
            metric,
            value: (0, value.to_string()),
        }
    }

    #[tokio::test]
    async fn builds_edge_from_four_metrics() {
        let mut responses = HashMap::new();
        responses.insert(
            REQUEST_TOTAL_METRIC.to_string(),
            Ok(MetricsQLQueryResult {
                result_type: "vector".to_string(),
                result: vec![sample("api-gw", "tps", "100")],
            }),
        );
        responses.insert(
            FAILED_TOTAL_METRIC.to_string(),
            Ok(MetricsQLQueryResult {
                result_type: "vector".to_string(),
                result: vec![sample("api-gw", "tps", "10")],
            }),
        );
        responses.insert(
            SERVER_SUM_METRIC.to_string(),
            Ok(MetricsQLQueryResult {
                result_type: "vector".to_string(),
                result: vec![sample("api-gw", "tps", "5000")],
            }),
        );
        responses.insert(
            SERVER_COUNT_METRIC.to_string(),
            Ok(MetricsQLQueryResult {
                result_type: "vector".to_string(),
                result: vec![sample("api-gw", "tps", "100")],
            }),
        );

        let querier = FakeQuerier {
            responses: Mutex::new(responses),
        };
        let builder = ServiceGraphBuilder::new(&querier);
        let graph = ServiceGraph::new();
        let mut diagnostics = Diagnostics::new();

        let now = Utc::now();
        builder
            .build(&graph, "tenant-1", now - chrono::Duration::seconds(60), now, &mut diagnostics)
            .await
            .unwrap();

        let edge = graph.get_edge("api-gw", "tps").unwrap().unwrap();
        assert_eq!(edge.request_count, 100);
        assert_eq!(edge.failure_count, 10);
        assert_eq!(edge.error_rate, 0.1);
        assert_eq!(edge.avg_latency_ms, 50.0);
    }

    #[tokio::test]
    async fn continues_when_one_metric_query_fails() {
        let mut responses = HashMap::new();
        responses.insert(
            REQUEST_TOTAL_METRIC.to_string(),
            Ok(MetricsQLQueryResult {
                result_type: "vector".to_string(),
                result: vec![sample("a", "b", "10")],
            }),
        );
        responses.insert(
            FAILED_TOTAL_METRIC.to_string(),
            Err("connection refused".to_string()),
        );

        let querier = FakeQuerier {
            responses: Mutex::new(responses),
        };
        let builder = ServiceGraphBuilder::new(&querier);
        let graph = ServiceGraph::new();
        let mut diagnostics = Diagnostics::new();

        let now = Utc::now();
        builder
            .build(&graph, "tenant-1", now - chrono::Duration::seconds(60), now, &mut diagnostics)
            .await
            .unwrap();

        assert_eq!(graph.get_edge("a", "b").unwrap().unwrap().request_count, 10);
        assert!(!diagnostics.to_notes().is_empty());
    }

    #[tokio::test]
    async fn rejects_invalid_window() {
        let querier = FakeQuerier {
            responses: Mutex::new(HashMap::new()),
        };
        let builder = ServiceGraphBuilder::new(&querier);
        let graph = ServiceGraph::new();
        let mut diagnostics = Diagnostics::new();
        let now = Utc::now();

        let result = builder.build(&graph, "tenant-1", now, now, &mut diagnostics).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn skips_samples_missing_client_or_server_label() {
        let mut metric = HashMap::new();
        metric.insert("client".to_string(), "a".to_string());
        // no "server" label and no alternates present
        let incomplete_sample = crate::querier::MetricsQLSample {
            metric,
            value: (0, "10".to_string()),
        };

        let mut responses = HashMap::new();
        responses.insert(
            REQUEST_TOTAL_METRIC.to_string(),
            Ok(MetricsQLQueryResult {
                result_type: "vector".to_string(),
                result: vec![incomplete_sample],
            }),
        );

        let querier = FakeQuerier {
            responses: Mutex::new(responses),
        };
        let builder = ServiceGraphBuilder::new(&querier);
        let graph = ServiceGraph::new();
        let mut diagnostics = Diagnostics::new();
        let now = Utc::now();

        builder
            .build(&graph, "tenant-1", now - chrono::Duration::seconds(60), now, &mut diagnostics)
            .await
            .unwrap();

        assert_eq!(graph.edge_count().unwrap(), 0);
    }
}
