//! Shared error vocabulary for the RCA data model.

use thiserror::Error;

/// Errors raised while validating an [`crate::incident::IncidentContext`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("incident time window is invalid: start={t_start}, peak={t_peak}, end={t_end}")]
    InvalidWindow {
        t_start: i64,
        t_peak: i64,
        t_end: i64,
    },

    #[error("incident window must have non-zero start/peak/end timestamps")]
    ZeroTimestamp,

    #[error("incident impact service must not be empty")]
    EmptyImpactService,

    #[error("incident severity {0} is outside [0.0, 1.0]")]
    SeverityOutOfRange(f64),

    #[error("dimension config weight for '{dimension}' is outside [0.0, 1.0]: {weight}")]
    DimensionWeightOutOfRange { dimension: String, weight: f64 },
}

/// Errors raised by [`crate::graph::ServiceGraph`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("service graph lock was poisoned")]
    LockPoisoned,

    #[error("window is invalid: start must be before end")]
    InvalidWindow,
}
