//! Shared data model for the incident root-cause-analysis engine: the
//! normalized anomaly representation, the time-ring classifier, the
//! service-dependency graph, and the incident/diagnostics types every
//! other RCA component builds on.

pub mod anomaly;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod incident;
pub mod mappers;
pub mod ring;

pub use anomaly::{
    severity_from_isolation_forest_score, AnomalyEvent, EnrichedAnomalyEvent, GraphDirection,
    IsolationForestDetails, Ring, SignalKind, SourceType,
};
pub use diagnostics::Diagnostics;
pub use error::{GraphError, ValidationError};
pub use graph::{ServiceEdge, ServiceGraph};
pub use incident::{ImpactDirection, ImpactSignal, IncidentContext, KpiMetadata, KpiSentiment};
pub use ring::{classify_ring, RingConfig};
