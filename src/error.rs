// src/error.rs
//! Typed errors for the ranking engine and its configuration.
//!
//! Per-record problems are never errors: they degrade the record and are
//! counted in [`crate::rank::RankReport`]. Only a batch that is not a
//! collection, or a config that is out of range, surfaces here.

use std::path::PathBuf;
use thiserror::Error;

/// Raised while loading or validating a [`crate::config::RankingConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config field `{field}` out of range: {value} ({reason})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("RANKING_CONFIG_PATH points to non-existent path {0}")]
    MissingPath(PathBuf),

    #[error("reading ranking config from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing ranking config {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Batch-level failure of a ranking call.
#[derive(Debug, Error)]
pub enum RankError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
