//! Orchestration layer for the incident root-cause-analysis engine:
//! collection, grouping, scoring, chain construction and the top-level
//! `RCAEngine` entry points, built on the shared types in `rca_core`.

pub mod candidate;
pub mod chain;
pub mod collector;
pub mod config;
pub mod correlation;
pub mod detector;
pub mod engine;
pub mod error;
pub mod graph_builder;
pub mod grouping;
pub mod label;
pub mod provider;
pub mod querier;
pub mod scoring;

pub use candidate::CandidateCauseService;
pub use chain::{ChainBuilder, RCAChain, RCAStep};
pub use config::{
    load_options, CollectOptions, DimensionSpec, GroupingConfig, RCADimensionConfig, RCAOptions,
    ScoringConfig,
};
pub use correlation::{
    select_focal_service, synthesize_template_chains, Cause, CorrelationEngine, CorrelationResult,
    RedAnchor, TimeRange,
};
pub use detector::{detect_incident, IncidentDetectorConfig, MetricPoint};
pub use engine::{RCAEngine, RCAIncident};
pub use error::{
    ChainError, CollectError, ConfigError, CorrelationError, MetricsQueryError, ProviderError, RcaError,
};
pub use graph_builder::ServiceGraphBuilder;
pub use grouping::{AnomalyGroup, GroupingEngine};
pub use label::{LabelAlternates, LabelDetector};
pub use provider::{AnomalyEventsProvider, StaticAnomalyEventsProvider};
pub use querier::{MetricsQLQueryRequest, MetricsQLQueryResult, MetricsQLSample, MetricsQuerier};
pub use scoring::{CandidateCause, DetailedScore, DimensionAlignmentRecord, ScoringEngine};
