//! Node core error types.

use thiserror::Error;

/// Errors from node operations and registry validation.
///
/// Validation variants map 1:1 to the control plane's fixed rejection
/// strings; the API layer translates variants to HTTP statuses.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("no namenode")]
    NoNamenode,

    #[error("duplicate node: {0}")]
    Duplicate(String),

    #[error("node not found: {0}")]
    NotFound(String),

    #[error("node not idle: {0}")]
    NotIdle(String),

    #[error("node idle: {0}")]
    Idle(String),

    #[error("node external: {0}")]
    External(String),

    #[error("node {0} has no runtime")]
    NoRuntime(String),

    #[error("invalid node expression: {0}")]
    InvalidExpr(String),

    #[error("invalid constraint: {0}")]
    InvalidConstraint(String),

    #[error("invalid node type: {0}")]
    InvalidType(String),

    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type NodeResult<T> = Result<T, NodeError>;
