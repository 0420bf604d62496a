//! Diagnostics (C11) — per-request accumulator of non-fatal warnings,
//! surfaced as notes on the final `RCAIncident`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Deduplicated sets of warnings collected over the lifetime of a single
/// `ComputeRCA` call. Not shared across requests, not thread-safe by
/// design (spec.md §5: callers in this design do not parallelize within
/// one request).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    missing_labels: BTreeSet<String>,
    dimension_misses: BTreeSet<String>,
    isolation_forest_tuning_hints: BTreeSet<String>,
    reduced_accuracy_reasons: BTreeSet<String>,
    metrics_query_warnings: BTreeSet<String>,
    general_notes: BTreeSet<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_missing_label(&mut self, label: impl Into<String>) {
        self.missing_labels.insert(label.into());
    }

    pub fn add_dimension_miss(&mut self, dimension: impl Into<String>) {
        self.dimension_misses.insert(dimension.into());
    }

    pub fn add_isolation_forest_tuning_hint(&mut self, hint: impl Into<String>) {
        self.isolation_forest_tuning_hints.insert(hint.into());
    }

    pub fn add_reduced_accuracy_reason(&mut self, reason: impl Into<String>) {
        self.reduced_accuracy_reasons.insert(reason.into());
    }

    pub fn add_metrics_query_warning(&mut self, warning: impl Into<String>) {
        self.metrics_query_warnings.insert(warning.into());
    }

    /// Informational note that doesn't fit any of the categories above
    /// (e.g. "KPI-sentiment bias applied") — never treated as significant.
    pub fn add_note(&mut self, note: impl Into<String>) {
        self.general_notes.insert(note.into());
    }

    /// True when enough has gone sideways that chain summaries should
    /// carry the "[Note: RCA accuracy may be reduced ...]" suffix
    /// (spec.md §4.6).
    pub fn has_significant_issues(&self) -> bool {
        !self.missing_labels.is_empty()
            || !self.reduced_accuracy_reasons.is_empty()
            || !self.metrics_query_warnings.is_empty()
    }

    /// Render every accumulated warning as a flat, deterministically
    /// ordered list of human-readable notes.
    pub fn to_notes(&self) -> Vec<String> {
        let mut notes = Vec::new();
        for label in &self.missing_labels {
            notes.push(format!("Missing standard label: {label}"));
        }
        for dim in &self.dimension_misses {
            notes.push(format!("Dimension '{dim}' could not be aligned"));
        }
        for hint in &self.isolation_forest_tuning_hints {
            notes.push(format!("Isolation-forest tuning hint: {hint}"));
        }
        for reason in &self.reduced_accuracy_reasons {
            notes.push(format!("Reduced accuracy: {reason}"));
        }
        for warning in &self.metrics_query_warnings {
            notes.push(format!("Metrics query warning: {warning}"));
        }
        for note in &self.general_notes {
            notes.push(note.clone());
        }
        notes
    }
}
