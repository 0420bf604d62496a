//! Config merger (C13) — defaults + global + per-request dimension config
//! + KPI metadata, merged and validated.

use std::fs;
use std::path::Path;

use rca_core::{RingConfig, ValidationError};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Options passed to the collector (C6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectOptions {
    pub pad_before_seconds: i64,
    pub pad_after_seconds: i64,
    pub min_severity: f64,
    pub min_anomaly_score: f64,
    #[serde(default)]
    pub allowed_signal_kinds: Option<Vec<rca_core::SignalKind>>,
    #[serde(default)]
    pub allowed_services: Option<Vec<String>>,
    pub max_events_per_ring: usize,
    pub sort_by_priority: bool,
    #[serde(default)]
    pub ring_config: RingConfig,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            pad_before_seconds: 600,
            pad_after_seconds: 60,
            min_severity: 0.0,
            min_anomaly_score: 0.0,
            allowed_signal_kinds: None,
            allowed_services: None,
            max_events_per_ring: 0,
            sort_by_priority: true,
            ring_config: RingConfig::default(),
        }
    }
}

/// Grouping engine config (C7).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupingConfig {
    pub bucket_width_seconds: i64,
    pub min_events_per_group: usize,
    pub min_severity: f64,
    pub min_anomaly_score: f64,
    pub group_by_component: bool,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            bucket_width_seconds: 10,
            min_events_per_group: 1,
            min_severity: 0.0,
            min_anomaly_score: 0.0,
            group_by_component: true,
        }
    }
}

/// Scoring weights + ranking cap (C8).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub ring_weight: f64,
    pub direction_weight: f64,
    pub distance_weight: f64,
    pub severity_weight: f64,
    pub anomaly_score_weight: f64,
    pub transaction_count_weight: f64,
    pub max_candidates_to_return: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            ring_weight: 0.20,
            direction_weight: 0.25,
            distance_weight: 0.15,
            severity_weight: 0.20,
            anomaly_score_weight: 0.10,
            transaction_count_weight: 0.10,
            max_candidates_to_return: 0,
        }
    }
}

impl ScoringConfig {
    pub fn weight_sum(&self) -> f64 {
        self.ring_weight
            + self.direction_weight
            + self.distance_weight
            + self.severity_weight
            + self.anomaly_score_weight
            + self.transaction_count_weight
    }
}

/// One extra user-configured dimension, compared between impact and
/// candidate groups for alignment scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionSpec {
    pub name: String,
    #[serde(default = "default_dimension_weight")]
    pub weight: f64,
}

fn default_dimension_weight() -> f64 {
    0.1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RCADimensionConfig {
    #[serde(default)]
    pub dimensions: Vec<DimensionSpec>,
    pub alignment_penalty: f64,
    pub alignment_bonus: f64,
}

impl Default for RCADimensionConfig {
    fn default() -> Self {
        Self {
            dimensions: Vec::new(),
            alignment_penalty: 0.2,
            alignment_bonus: 0.1,
        }
    }
}

impl RCADimensionConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&self.alignment_penalty) {
            return Err(ValidationError::DimensionWeightOutOfRange {
                dimension: "alignment_penalty".to_string(),
                weight: self.alignment_penalty,
            });
        }
        if !(0.0..=1.0).contains(&self.alignment_bonus) {
            return Err(ValidationError::DimensionWeightOutOfRange {
                dimension: "alignment_bonus".to_string(),
                weight: self.alignment_bonus,
            });
        }
        for dim in &self.dimensions {
            if !(0.0..=1.0).contains(&dim.weight) {
                return Err(ValidationError::DimensionWeightOutOfRange {
                    dimension: dim.name.clone(),
                    weight: dim.weight,
                });
            }
        }
        Ok(())
    }
}

/// Top-level options for `ComputeRCA`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RCAOptions {
    pub max_chains: usize,
    pub max_steps_per_chain: usize,
    pub min_score_threshold: f64,
    #[serde(default)]
    pub collect: CollectOptions,
    #[serde(default)]
    pub grouping: GroupingConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub dimensions: RCADimensionConfig,
}

impl Default for RCAOptions {
    fn default() -> Self {
        Self {
            max_chains: 5,
            max_steps_per_chain: 10,
            min_score_threshold: 0.1,
            collect: CollectOptions::default(),
            grouping: GroupingConfig::default(),
            scoring: ScoringConfig::default(),
            dimensions: RCADimensionConfig::default(),
        }
    }
}

/// Merges global defaults with per-request overrides and validates the
/// result. Non-fatal issues (e.g. an empty dimension name) are dropped
/// with a diagnostic rather than rejected outright; only out-of-range
/// weights and malformed windows are fatal validation errors.
pub fn merge_options(
    defaults: &RCAOptions,
    overrides: Option<RCAOptions>,
) -> Result<RCAOptions, ValidationError> {
    let merged = overrides.unwrap_or_else(|| defaults.clone());
    merged.dimensions.validate()?;
    if merged.max_chains == 0 {
        return Err(ValidationError::DimensionWeightOutOfRange {
            dimension: "max_chains".to_string(),
            weight: 0.0,
        });
    }
    Ok(merged)
}

/// Loads `RCAOptions` defaults from a TOML file on disk, for deployments
/// that keep the global defaults outside the binary (operators editing a
/// `rca.toml` rather than redeploying).
pub fn load_options<P: AsRef<Path>>(path: P) -> Result<RCAOptions, ConfigError> {
    let content = fs::read_to_string(path)?;
    let options = toml::from_str(&content)?;
    Ok(options)
}
