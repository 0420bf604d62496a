//! Error taxonomy for the RCA engine (spec.md §7). Warnings never appear
//! here — they live in [`rca_core::Diagnostics`] and are surfaced through
//! `RCAIncident.notes`, so they cannot accidentally become fatal.

use rca_core::{GraphError, ValidationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("anomaly provider request failed: {0}")]
    RequestFailed(String),

    #[error("anomaly provider returned an invalid time window")]
    InvalidWindow,
}

#[derive(Error, Debug)]
pub enum MetricsQueryError {
    #[error("metrics query failed: {0}")]
    QueryFailed(String),

    #[error("metrics query request had an invalid window")]
    InvalidWindow,
}

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("anomaly provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
}

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("graph error while building chain: {0}")]
    Graph(#[from] GraphError),

    #[error("no candidates available to build a chain from")]
    NoCandidates,
}

#[derive(Error, Debug)]
pub enum CorrelationError {
    #[error("correlation engine request failed: {0}")]
    RequestFailed(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level error returned by `ComputeRCA` / `ComputeRCAByTimeRange`.
/// Validation and provider errors are fatal; everything else that can go
/// wrong mid-pipeline is either caught and logged (chain-build failures
/// per candidate) or recorded as a diagnostic note, never propagated here.
#[derive(Error, Debug)]
pub enum RcaError {
    #[error("invalid incident context: {0}")]
    Validation(#[from] ValidationError),

    #[error("anomaly collection failed: {0}")]
    Collect(#[from] CollectError),

    #[error("candidate scoring failed: {0}")]
    Graph(#[from] GraphError),

    #[error("chain construction failed: {0}")]
    Chain(#[from] ChainError),

    #[error("correlation engine failed: {0}")]
    Correlation(#[from] CorrelationError),

    #[error("operation was cancelled")]
    Cancelled,
}
