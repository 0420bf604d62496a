//! Mapper functions that normalize heterogeneous signal sources (spans,
//! metrics, severity logs, change events) into a uniform [`AnomalyEvent`].
//! No inheritance hierarchy is needed — each source gets one function that
//! returns the same struct (spec.md §9, "polymorphism over anomaly
//! sources").

pub mod change;
pub mod log;
pub mod metric;
pub mod span;

pub use change::anomaly_event_from_change_event;
pub use log::anomaly_event_from_severity_log;
pub use metric::anomaly_event_from_metric_rule;
pub use span::anomaly_event_from_isolation_forest_span;
