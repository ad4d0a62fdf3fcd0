//! Scheduler error types.

use thiserror::Error;

use dfsgrid_node::NodeError;

/// Errors that can occur during scheduling operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Node(#[from] NodeError),

    #[error("driver: {0}")]
    Driver(#[from] anyhow::Error),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
