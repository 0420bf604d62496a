//! Incident context — the entry-point record describing what breached and
//! when.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Whether an increase or a decrease in the impact metric is the bad
/// direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactDirection {
    HigherIsWorse,
    LowerIsWorse,
}

/// The signal that breached, naming the metric and optional label
/// selectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactSignal {
    pub service: String,
    pub metric: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
    pub direction: ImpactDirection,
    pub threshold: f64,
}

/// Whether an increase in a business KPI is good, bad, or neutral news.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KpiSentiment {
    Negative,
    Positive,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiMetadata {
    pub name: String,
    pub sentiment: KpiSentiment,
    pub impact_is_kpi: bool,
}

/// `id`, impact service/signal, time window, severity, and optional KPI
/// metadata describing one incident. Validated before any use; invalid
/// contexts are rejected by [`IncidentContext::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentContext {
    pub id: String,
    pub impact_service: String,
    pub impact_signal: ImpactSignal,
    pub t_start: DateTime<Utc>,
    pub t_peak: DateTime<Utc>,
    pub t_end: DateTime<Utc>,
    pub severity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kpi: Option<KpiMetadata>,
}

impl IncidentContext {
    /// Validate the window ordering (`TStart < TPeak <= TEnd`, all
    /// non-zero), the impact service name, and severity bounds.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.impact_service.trim().is_empty() {
            return Err(ValidationError::EmptyImpactService);
        }

        let zero = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        if self.t_start == zero || self.t_peak == zero || self.t_end == zero {
            return Err(ValidationError::ZeroTimestamp);
        }

        if !(self.t_start < self.t_peak && self.t_peak <= self.t_end) {
            return Err(ValidationError::InvalidWindow {
                t_start: self.t_start.timestamp(),
                t_peak: self.t_peak.timestamp(),
                t_end: self.t_end.timestamp(),
            });
        }

        if !(0.0..=1.0).contains(&self.severity) {
            return Err(ValidationError::SeverityOutOfRange(self.severity));
        }

        Ok(())
    }
}
