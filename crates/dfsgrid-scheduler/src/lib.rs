//! dfsgrid-scheduler — the decision loop around the node core.
//!
//! The [`Scheduler`] owns the node registry and serializes every mutation:
//! offers are processed one at a time against a consistent registry
//! snapshot, so two offers can never both allocate the same node or port.
//! The resource-manager integration is abstracted behind the [`Driver`]
//! trait; operator commands arrive from the API layer.

pub mod driver;
pub mod error;
pub mod options;
pub mod scheduler;

pub use driver::{Driver, LogDriver, TaskState, TaskStatusUpdate};
pub use error::{SchedulerError, SchedulerResult};
pub use options::NodeOptions;
pub use scheduler::{Scheduler, StartStopStatus};
