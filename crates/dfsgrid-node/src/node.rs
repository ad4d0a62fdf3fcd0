//! The managed node — one HDFS process scheduled onto offered capacity.
//!
//! `Node` owns the three hard pieces of the scheduler: offer eligibility
//! ([`Node::matches`]), deterministic sub-allocation carving
//! ([`Node::reserve`]), and the lifecycle state machine driven by operator
//! commands and task-status events. The surrounding decision loop lives in
//! `dfsgrid-scheduler`; everything here is pure in-memory computation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dfsgrid_core::{Offer, PortRange};

use crate::constraint::Constraint;
use crate::error::{NodeError, NodeResult};
use crate::failover::Failover;
use crate::registry::Nodes;
use crate::reservation::{PortKind, Reservation, reserve_port};
use crate::stickiness::Stickiness;

/// Default cpu target for a new node.
pub const DEFAULT_CPUS: f64 = 0.5;
/// Default memory target (MB) for a new node.
pub const DEFAULT_MEM: u64 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Namenode,
    Datanode,
}

impl FromStr for NodeType {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "namenode" => Ok(NodeType::Namenode),
            "datanode" => Ok(NodeType::Datanode),
            other => Err(NodeError::InvalidType(other.to_string())),
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Namenode => write!(f, "namenode"),
            NodeType::Datanode => write!(f, "datanode"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Idle,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Idle => write!(f, "idle"),
            NodeState::Starting => write!(f, "starting"),
            NodeState::Running => write!(f, "running"),
            NodeState::Stopping => write!(f, "stopping"),
        }
    }
}

/// Live identity of a launched task. Exists only while the node is not idle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runtime {
    pub task_id: String,
    pub executor_id: String,
    pub slave_id: String,
    pub hostname: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Filesystem endpoint datanodes and clients should use.
    pub fs_uri: String,
    #[serde(default)]
    pub kill_sent: bool,
}

/// Task descriptor handed to the driver's launch primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: String,
    pub name: String,
    pub slave_id: String,
    pub executor_id: String,
    /// The node's serialized state, shipped to the executor.
    pub data: String,
    pub resources: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeType,
    pub state: NodeState,

    pub cpus: f64,
    pub mem: u64,

    /// Placement constraints in evaluation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<(String, Constraint)>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_jvm_opts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hadoop_jvm_opts: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub core_site_opts: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hdfs_site_opts: BTreeMap<String, String>,

    /// Externally managed filesystem; meaningful on a namenode only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_fs_uri: Option<String>,

    pub stickiness: Stickiness,
    pub failover: Failover,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<Runtime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation: Option<Reservation>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeType) -> Self {
        Self {
            id: id.into(),
            kind,
            state: NodeState::Idle,
            cpus: DEFAULT_CPUS,
            mem: DEFAULT_MEM,
            constraints: Vec::new(),
            executor_jvm_opts: None,
            hadoop_jvm_opts: None,
            core_site_opts: BTreeMap::new(),
            hdfs_site_opts: BTreeMap::new(),
            external_fs_uri: None,
            stickiness: Stickiness::default(),
            failover: Failover::default(),
            runtime: None,
            reservation: None,
        }
    }

    /// A namenode whose filesystem is managed outside the framework; such
    /// nodes are never started or stopped.
    pub fn is_external(&self) -> bool {
        self.external_fs_uri.is_some()
    }

    /// Decide whether this node can run on `offer`.
    ///
    /// Returns the rejection reason, or `None` when eligible. Checks run in
    /// a fixed order and short-circuit: resources, namenode dependency,
    /// constraints (in configured order), stickiness. `other_attributes`
    /// maps attribute name to the values of all other placed nodes.
    pub fn matches(
        &self,
        offer: &Offer,
        other_attributes: &BTreeMap<String, Vec<String>>,
        now: u64,
        registry: &Nodes,
    ) -> Option<String> {
        if offer.cpus < self.cpus {
            return Some(format!("cpus < {}", self.cpus));
        }
        if offer.mem < self.mem {
            return Some(format!("mem < {}", self.mem));
        }

        if self.kind == NodeType::Datanode {
            let mut namenodes = registry.namenodes().peekable();
            if namenodes.peek().is_none() {
                return Some("no namenode".to_string());
            }
            let resolvable = namenodes
                .any(|nn| nn.state == NodeState::Running || nn.external_fs_uri.is_some());
            if !resolvable {
                return Some("no running or external namenode".to_string());
            }
        }

        for (name, constraint) in &self.constraints {
            let others = other_attributes
                .get(name)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let ok = match offer.attributes.get(name) {
                Some(value) => constraint.matches(value, others),
                // Absent attribute: like/unlike cannot match; groupBy sees
                // no observation for this host and stays permissive.
                None => matches!(constraint, Constraint::GroupBy { .. }),
            };
            if !ok {
                return Some(format!("{name} doesn't match {constraint}"));
            }
        }

        if !self.stickiness.allows_hostname(&offer.hostname, now) {
            return Some("hostname != stickiness hostname".to_string());
        }

        None
    }

    /// Carve a trial allocation out of `offer`.
    ///
    /// Cpus and mem are capped at both the node's target and the offer's
    /// free amount. Ports (HTTP then IPC, lowest first) are carved only when
    /// the reservation is complete; each carve observes the pool already
    /// shrunk by the previous one. An incomplete reservation is informational
    /// and must not be committed.
    pub fn reserve(&self, offer: &Offer) -> Reservation {
        let cpus = self.cpus.min(offer.cpus);
        let mem = self.mem.min(offer.mem);

        let mut ports = BTreeMap::new();
        if cpus == self.cpus && mem == self.mem {
            let domain = PortRange {
                start: 0,
                end: 65535,
            };
            let mut free = offer.ports.clone();
            if let Some(port) = reserve_port(&domain, &mut free) {
                ports.insert(PortKind::Http, port);
            }
            if let Some(port) = reserve_port(&domain, &mut free) {
                ports.insert(PortKind::Ipc, port);
            }
        }

        Reservation { cpus, mem, ports }
    }

    /// Commit `offer`: carve the reservation, generate fresh task/executor
    /// identifiers, and resolve the filesystem endpoint.
    ///
    /// Fails without any mutation when this is a datanode and no namenode is
    /// resolvable (running runtime or external filesystem).
    pub fn init_runtime(&mut self, offer: &Offer, registry: &Nodes) -> NodeResult<()> {
        let reservation = self.reserve(offer);
        let fs_uri = self.resolve_fs_uri(offer, &reservation, registry)?;

        self.runtime = Some(Runtime {
            task_id: format!("hdfs-{}-{}", self.id, Uuid::new_v4()),
            executor_id: format!("hdfs-{}-{}", self.id, Uuid::new_v4()),
            slave_id: offer.slave_id.clone(),
            hostname: offer.hostname.clone(),
            attributes: offer.attributes.clone(),
            fs_uri,
            kill_sent: false,
        });
        self.reservation = Some(reservation);
        Ok(())
    }

    fn resolve_fs_uri(
        &self,
        offer: &Offer,
        reservation: &Reservation,
        registry: &Nodes,
    ) -> NodeResult<String> {
        match self.kind {
            NodeType::Namenode => {
                let ipc = reservation
                    .ports
                    .get(&PortKind::Ipc)
                    .copied()
                    .unwrap_or(0);
                Ok(format!("hdfs://{}:{ipc}", offer.hostname))
            }
            NodeType::Datanode => {
                for nn in registry.namenodes() {
                    if let Some(runtime) = &nn.runtime {
                        return Ok(runtime.fs_uri.clone());
                    }
                    if let Some(uri) = &nn.external_fs_uri {
                        return Ok(uri.clone());
                    }
                }
                Err(NodeError::NoNamenode)
            }
        }
    }

    /// Build the task descriptor for the committed runtime.
    pub fn new_task(&self) -> NodeResult<TaskSpec> {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| NodeError::NoRuntime(self.id.clone()))?;
        let resources = self
            .reservation
            .as_ref()
            .map(Reservation::to_resources)
            .unwrap_or_default();

        Ok(TaskSpec {
            id: runtime.task_id.clone(),
            name: format!("hdfs-{}", self.id),
            slave_id: runtime.slave_id.clone(),
            executor_id: runtime.executor_id.clone(),
            data: serde_json::to_string(self)?,
            resources,
        })
    }

    pub fn register_start(&mut self, hostname: &str) {
        self.stickiness.register_start(hostname);
    }

    pub fn register_stop(&mut self, now: u64, persist: bool) {
        self.stickiness.register_stop(now, persist);
    }
}
