//! The seam to the resource-manager's driver layer.
//!
//! The platform integration (offer delivery, task supervision) lives
//! outside this crate; the scheduler only needs the three send-command
//! primitives below plus the task-status events fed to
//! [`Scheduler::on_task_status`](crate::Scheduler::on_task_status).

use serde::{Deserialize, Serialize};
use tracing::debug;

use dfsgrid_node::TaskSpec;

/// Commands the scheduler sends down to the resource manager.
pub trait Driver: Send + Sync {
    fn launch_task(&self, offer_id: &str, task: &TaskSpec) -> anyhow::Result<()>;
    fn kill_task(&self, task_id: &str) -> anyhow::Result<()>;
    fn decline_offer(&self, offer_id: &str) -> anyhow::Result<()>;
}

/// Driver that only logs — used by tests and by the standalone daemon
/// where no resource-manager binding is attached.
#[derive(Debug, Default)]
pub struct LogDriver;

impl Driver for LogDriver {
    fn launch_task(&self, offer_id: &str, task: &TaskSpec) -> anyhow::Result<()> {
        debug!(%offer_id, task_id = %task.id, "launch task");
        Ok(())
    }

    fn kill_task(&self, task_id: &str) -> anyhow::Result<()> {
        debug!(%task_id, "kill task");
        Ok(())
    }

    fn decline_offer(&self, offer_id: &str) -> anyhow::Result<()> {
        debug!(%offer_id, "decline offer");
        Ok(())
    }
}

/// Task states reported by the resource manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Starting,
    Running,
    Finished,
    Failed,
    Killed,
    Lost,
    Error,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Finished
                | TaskState::Failed
                | TaskState::Killed
                | TaskState::Lost
                | TaskState::Error
        )
    }

    /// Terminal states that count against the failover policy.
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskState::Failed | TaskState::Lost | TaskState::Error)
    }
}

/// A task-status event delivered by the driver layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusUpdate {
    pub task_id: String,
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TaskStatusUpdate {
    pub fn new(task_id: impl Into<String>, state: TaskState) -> Self {
        Self {
            task_id: task_id.into(),
            state,
            message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_and_failure_classification() {
        assert!(!TaskState::Starting.is_terminal());
        assert!(!TaskState::Running.is_terminal());

        for state in [
            TaskState::Finished,
            TaskState::Failed,
            TaskState::Killed,
            TaskState::Lost,
            TaskState::Error,
        ] {
            assert!(state.is_terminal());
        }

        assert!(TaskState::Failed.is_failure());
        assert!(TaskState::Lost.is_failure());
        assert!(!TaskState::Finished.is_failure());
        assert!(!TaskState::Killed.is_failure());
    }
}
