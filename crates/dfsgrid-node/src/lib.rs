//! dfsgrid-node — the placement-decision core.
//!
//! A managed [`Node`] is one HDFS process (namenode or datanode) scheduled
//! onto cluster capacity offered by the resource manager. This crate owns
//! everything that is genuinely algorithmic about that:
//!
//! - offer eligibility ([`Node::matches`]): resource sufficiency, the
//!   datanode→namenode dependency, attribute [`Constraint`]s, and
//!   host-affinity ([`Stickiness`])
//! - exact sub-allocation carving ([`Node::reserve`] and the disjoint
//!   interval allocator [`reservation::reserve_port`])
//! - restart backoff after task failure ([`Failover`])
//! - the node lifecycle state machine driven by operator commands and
//!   task-status events
//!
//! The [`Nodes`] registry collects all nodes, expands id expressions, and
//! snapshots losslessly to JSON ([`storage::FileStorage`]).

pub mod constraint;
pub mod error;
pub mod failover;
pub mod node;
pub mod registry;
pub mod reservation;
pub mod stickiness;
pub mod storage;

pub use constraint::Constraint;
pub use error::{NodeError, NodeResult};
pub use failover::Failover;
pub use node::{Node, NodeState, NodeType, Runtime, TaskSpec};
pub use registry::Nodes;
pub use reservation::{PortKind, Reservation};
pub use stickiness::Stickiness;
pub use storage::FileStorage;
