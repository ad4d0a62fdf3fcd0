//! Core error types.

use thiserror::Error;

/// Errors from parsing the shared primitive types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid period: {0}")]
    InvalidPeriod(String),

    #[error("invalid port range: {0}")]
    InvalidRange(String),

    #[error("invalid map entry: {0}")]
    InvalidMapEntry(String),

    #[error("config: {0}")]
    Config(#[from] anyhow::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
