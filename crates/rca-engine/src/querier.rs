//! `MetricsQuerier` — the abstract metric-store collaborator consumed by
//! the graph builder and incident detector. Protocol and on-wire format
//! are explicitly out of scope (spec.md §1); this crate only depends on
//! the shape described in spec.md §6.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MetricsQueryError;

/// A PromQL-compatible query against a tenant's metric store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsQLQueryRequest {
    pub tenant_id: String,
    pub expression: String,
}

/// One labeled time-series sample, as `{metric: {...}, value: [ts,
/// "val"]}` deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsQLSample {
    pub metric: HashMap<String, String>,
    /// `(unix_timestamp, value_as_string)`, matching the wire shape in
    /// spec.md §6 exactly.
    pub value: (i64, String),
}

impl MetricsQLSample {
    pub fn value_as_f64(&self) -> Option<f64> {
        self.value.1.parse::<f64>().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsQLQueryResult {
    pub result_type: String,
    pub result: Vec<MetricsQLSample>,
}

#[async_trait]
pub trait MetricsQuerier: Send + Sync {
    async fn execute_query(
        &self,
        request: MetricsQLQueryRequest,
    ) -> Result<MetricsQLQueryResult, MetricsQueryError>;
}
