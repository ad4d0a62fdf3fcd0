//! The decision loop.
//!
//! One [`Scheduler`] owns the node registry behind a `tokio::sync::RwLock`.
//! Every offer is processed under a single write lock, so one decision cycle
//! sees a consistent registry and two offers can never allocate the same node
//! or port. Task-status events and operator commands mutate under the same
//! lock; every mutation is followed by a snapshot save and a nudge on the
//! change channel that condition waits subscribe to.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, watch};
use tokio::time::{Duration, Instant, timeout_at};
use tracing::{debug, error, info, warn};

use dfsgrid_core::{Offer, Period};
use dfsgrid_node::{FileStorage, Node, NodeError, NodeState, NodeType, Nodes};

use crate::driver::{Driver, TaskState, TaskStatusUpdate};
use crate::error::SchedulerResult;
use crate::options::NodeOptions;

/// Outcome of an operator start or stop command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartStopStatus {
    /// Transition requested, no wait was asked for.
    Scheduled,
    Started,
    Stopped,
    /// The wait deadline passed; the transition itself keeps going.
    Timeout,
}

pub struct Scheduler {
    nodes: Arc<RwLock<Nodes>>,
    driver: Arc<dyn Driver>,
    storage: Option<FileStorage>,
    changed: watch::Sender<u64>,
}

impl Scheduler {
    pub fn new(driver: Arc<dyn Driver>, nodes: Nodes, storage: Option<FileStorage>) -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            nodes: Arc::new(RwLock::new(nodes)),
            driver,
            storage,
            changed,
        }
    }

    // ── Offer processing ────────────────────────────────────────────────

    /// Run one decision cycle against `offer`.
    ///
    /// Returns `true` when a task was launched. At most one node is placed
    /// per offer; with no taker the offer is declined.
    pub async fn on_offer(&self, offer: &Offer) -> SchedulerResult<bool> {
        self.process_offer(offer, epoch_ms()).await
    }

    async fn process_offer(&self, offer: &Offer, now: u64) -> SchedulerResult<bool> {
        let mut nodes = self.nodes.write().await;

        self.retry_pending_kills(&mut nodes);

        let candidates: Vec<String> = nodes
            .all()
            .iter()
            .filter(|n| {
                n.state == NodeState::Starting
                    && n.runtime.is_none()
                    && !n.failover.is_waiting_delay(now)
                    && !n.failover.is_max_tries_exceeded()
            })
            .map(|n| n.id.clone())
            .collect();

        for id in candidates {
            let observed = nodes.other_attributes(&id);
            let Some(node) = nodes.get(&id) else {
                continue;
            };

            if let Some(reason) = node.matches(offer, &observed, now, &nodes) {
                debug!(node_id = %id, offer_id = %offer.id, %reason, "offer rejected");
                continue;
            }

            let mut placed = node.clone();
            if let Err(e) = placed.init_runtime(offer, &nodes) {
                debug!(node_id = %id, offer_id = %offer.id, error = %e, "cannot commit offer");
                continue;
            }
            let task = placed.new_task()?;
            self.driver.launch_task(&offer.id, &task)?;

            let task_id = task.id.clone();
            if let Some(slot) = nodes.get_mut(&id) {
                *slot = placed;
            }
            info!(node_id = %id, offer_id = %offer.id, %task_id, hostname = %offer.hostname, "task launched");

            self.persist(&nodes);
            self.touch();
            return Ok(true);
        }

        self.driver.decline_offer(&offer.id)?;
        Ok(false)
    }

    /// Re-send kills for stopping nodes whose kill never went out.
    fn retry_pending_kills(&self, nodes: &mut Nodes) {
        let pending: Vec<String> = nodes
            .all()
            .iter()
            .filter(|n| {
                n.state == NodeState::Stopping
                    && n.runtime.as_ref().is_some_and(|r| !r.kill_sent)
            })
            .map(|n| n.id.clone())
            .collect();

        for id in pending {
            let Some(node) = nodes.get_mut(&id) else {
                continue;
            };
            let Some(runtime) = node.runtime.as_mut() else {
                continue;
            };
            match self.driver.kill_task(&runtime.task_id) {
                Ok(()) => runtime.kill_sent = true,
                Err(e) => warn!(node_id = %id, error = %e, "kill retry failed"),
            }
        }
    }

    // ── Task-status handling ────────────────────────────────────────────

    /// Drive the owning node's lifecycle from a task-status event.
    pub async fn on_task_status(&self, update: &TaskStatusUpdate) -> SchedulerResult<()> {
        self.handle_task_status(update, epoch_ms()).await
    }

    async fn handle_task_status(&self, update: &TaskStatusUpdate, now: u64) -> SchedulerResult<()> {
        let mut nodes = self.nodes.write().await;

        let Some(id) = nodes
            .find_by_task_id(&update.task_id)
            .map(|n| n.id.clone())
        else {
            warn!(task_id = %update.task_id, state = ?update.state, "status for unknown task, killing");
            if let Err(e) = self.driver.kill_task(&update.task_id) {
                warn!(task_id = %update.task_id, error = %e, "kill of unknown task failed");
            }
            return Ok(());
        };

        if update.state == TaskState::Running {
            // get_mut cannot miss, the id came from this registry
            if let Some(node) = nodes.get_mut(&id) {
                if node.state == NodeState::Starting {
                    node.state = NodeState::Running;
                    let hostname = node.runtime.as_ref().map(|r| r.hostname.clone());
                    if let Some(hostname) = hostname {
                        node.register_start(&hostname);
                    }
                    info!(node_id = %id, "node running");
                }
            }
            self.persist(&nodes);
            self.touch();
            return Ok(());
        }

        if !update.state.is_terminal() {
            debug!(node_id = %id, state = ?update.state, "intermediate task state");
            return Ok(());
        }

        if let Some(node) = nodes.get_mut(&id) {
            let failed = update.state.is_failure();
            let operator_stop = node.state == NodeState::Stopping;

            if failed && !operator_stop {
                node.failover.register_failure(now);
            }
            let keep_affinity = node.stickiness.persist;
            node.register_stop(now, keep_affinity);
            node.runtime = None;
            node.reservation = None;

            node.state = if !failed || operator_stop {
                NodeState::Idle
            } else if node.failover.is_max_tries_exceeded() {
                error!(
                    node_id = %id,
                    failures = node.failover.failures,
                    "node exceeded max tries, giving up"
                );
                NodeState::Idle
            } else {
                info!(
                    node_id = %id,
                    failures = node.failover.failures,
                    delay = %node.failover.current_delay(),
                    "node failed, rescheduling after backoff"
                );
                NodeState::Starting
            };
        }

        self.persist(&nodes);
        self.touch();
        Ok(())
    }

    // ── Operator commands ───────────────────────────────────────────────

    /// Create the nodes an id expression names. All ids are validated
    /// before the first node is created.
    pub async fn add_nodes(
        &self,
        expr: &str,
        kind: NodeType,
        options: &NodeOptions,
    ) -> SchedulerResult<Vec<Node>> {
        let mut nodes = self.nodes.write().await;
        let ids = nodes.expand_expr(expr)?;

        for id in &ids {
            if nodes.get(id).is_some() {
                return Err(NodeError::Duplicate(id.clone()).into());
            }
        }

        let mut added = Vec::with_capacity(ids.len());
        for id in ids {
            let mut node = Node::new(id, kind);
            options.apply(&mut node);
            if node.kind == NodeType::Datanode {
                node.external_fs_uri = None;
            }
            added.push(nodes.add(node)?.clone());
        }

        info!(count = added.len(), "nodes added");
        self.persist(&nodes);
        self.touch();
        Ok(added)
    }

    /// Reconfigure idle nodes. External filesystem settings only stick on
    /// namenodes.
    pub async fn update_nodes(
        &self,
        expr: &str,
        options: &NodeOptions,
    ) -> SchedulerResult<Vec<Node>> {
        let mut nodes = self.nodes.write().await;
        let ids = self.resolve_existing(&nodes, expr)?;

        for id in &ids {
            if let Some(node) = nodes.get(id)
                && node.state != NodeState::Idle
            {
                return Err(NodeError::NotIdle(id.clone()).into());
            }
        }

        let mut updated = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(node) = nodes.get_mut(&id) {
                options.apply(node);
                if node.kind == NodeType::Datanode {
                    node.external_fs_uri = None;
                }
                updated.push(node.clone());
            }
        }

        self.persist(&nodes);
        self.touch();
        Ok(updated)
    }

    /// Mark idle nodes for launch, then optionally wait for them to run.
    pub async fn start_nodes(
        &self,
        expr: &str,
        timeout: Period,
    ) -> SchedulerResult<(StartStopStatus, Vec<Node>)> {
        let ids = {
            let mut nodes = self.nodes.write().await;
            let ids = self.resolve_existing(&nodes, expr)?;

            for id in &ids {
                let Some(node) = nodes.get(id) else { continue };
                if node.is_external() {
                    return Err(NodeError::External(id.clone()).into());
                }
                if node.state != NodeState::Idle {
                    return Err(NodeError::NotIdle(id.clone()).into());
                }
            }

            for id in &ids {
                if let Some(node) = nodes.get_mut(id) {
                    node.failover.reset_failures();
                    node.state = NodeState::Starting;
                    info!(node_id = %id, "node scheduled to start");
                }
            }

            self.persist(&nodes);
            self.touch();
            ids
        };

        if timeout.ms() == 0 {
            return Ok((StartStopStatus::Scheduled, self.clones(&ids).await));
        }

        let deadline = Instant::now() + Duration::from_millis(timeout.ms());
        for id in &ids {
            if !self.wait_until(id, NodeState::Running, deadline).await {
                return Ok((StartStopStatus::Timeout, self.clones(&ids).await));
            }
        }
        Ok((StartStopStatus::Started, self.clones(&ids).await))
    }

    /// Stop non-idle nodes, then optionally wait for them to go idle.
    ///
    /// A node with a launched task moves to stopping and its task is killed;
    /// a node still waiting for an offer drops straight back to idle.
    pub async fn stop_nodes(
        &self,
        expr: &str,
        timeout: Period,
    ) -> SchedulerResult<(StartStopStatus, Vec<Node>)> {
        let ids = {
            let mut nodes = self.nodes.write().await;
            let ids = self.resolve_existing(&nodes, expr)?;

            for id in &ids {
                let Some(node) = nodes.get(id) else { continue };
                if node.is_external() {
                    return Err(NodeError::External(id.clone()).into());
                }
                if node.state == NodeState::Idle {
                    return Err(NodeError::Idle(id.clone()).into());
                }
            }

            for id in &ids {
                let Some(node) = nodes.get_mut(id) else { continue };
                node.failover.reset_failures();
                match node.runtime.as_mut() {
                    Some(runtime) => {
                        node.state = NodeState::Stopping;
                        match self.driver.kill_task(&runtime.task_id) {
                            Ok(()) => runtime.kill_sent = true,
                            // picked up again on the next offer
                            Err(e) => warn!(node_id = %id, error = %e, "kill failed"),
                        }
                        info!(node_id = %id, "node stopping");
                    }
                    None => {
                        node.state = NodeState::Idle;
                        info!(node_id = %id, "node stopped before launch");
                    }
                }
            }

            self.persist(&nodes);
            self.touch();
            ids
        };

        if timeout.ms() == 0 {
            return Ok((StartStopStatus::Scheduled, self.clones(&ids).await));
        }

        let deadline = Instant::now() + Duration::from_millis(timeout.ms());
        for id in &ids {
            if !self.wait_until(id, NodeState::Idle, deadline).await {
                return Ok((StartStopStatus::Timeout, self.clones(&ids).await));
            }
        }
        Ok((StartStopStatus::Stopped, self.clones(&ids).await))
    }

    /// Remove idle nodes; returns the removed ids.
    pub async fn remove_nodes(&self, expr: &str) -> SchedulerResult<Vec<String>> {
        let mut nodes = self.nodes.write().await;
        let ids = self.resolve_existing(&nodes, expr)?;

        for id in &ids {
            if let Some(node) = nodes.get(id)
                && node.state != NodeState::Idle
            {
                return Err(NodeError::NotIdle(id.clone()).into());
            }
        }

        for id in &ids {
            nodes.remove(id)?;
            info!(node_id = %id, "node removed");
        }

        self.persist(&nodes);
        self.touch();
        Ok(ids)
    }

    /// Nodes an id expression names, skipping ids produced by a range that
    /// never existed.
    pub async fn list_nodes(&self, expr: &str) -> SchedulerResult<Vec<Node>> {
        let nodes = self.nodes.read().await;
        let ids = nodes.expand_expr(expr)?;
        Ok(ids
            .iter()
            .filter_map(|id| nodes.get(id))
            .cloned()
            .collect())
    }

    /// Block until `id` reaches `state` or the timeout elapses. A timeout
    /// never aborts the underlying transition.
    pub async fn wait_for_state(&self, id: &str, state: NodeState, timeout: Period) -> bool {
        let deadline = Instant::now() + Duration::from_millis(timeout.ms());
        self.wait_until(id, state, deadline).await
    }

    // ── Internal helpers ────────────────────────────────────────────────

    /// Expand `expr` and require every produced id to exist.
    fn resolve_existing(&self, nodes: &Nodes, expr: &str) -> SchedulerResult<Vec<String>> {
        let ids = nodes.expand_expr(expr)?;
        for id in &ids {
            if nodes.get(id).is_none() {
                return Err(NodeError::NotFound(id.clone()).into());
            }
        }
        Ok(ids)
    }

    async fn wait_until(&self, id: &str, state: NodeState, deadline: Instant) -> bool {
        let mut rx = self.changed.subscribe();
        loop {
            if self.nodes.read().await.get(id).map(|n| n.state) == Some(state) {
                return true;
            }
            match timeout_at(deadline, rx.changed()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) | Err(_) => return false,
            }
        }
    }

    async fn clones(&self, ids: &[String]) -> Vec<Node> {
        let nodes = self.nodes.read().await;
        ids.iter().filter_map(|id| nodes.get(id)).cloned().collect()
    }

    /// Save the snapshot; a failed save is logged, never fatal to the
    /// in-memory transition that triggered it.
    fn persist(&self, nodes: &Nodes) {
        if let Some(storage) = &self.storage
            && let Err(e) = storage.save(nodes)
        {
            error!(error = %e, "registry snapshot save failed");
        }
    }

    fn touch(&self) {
        self.changed.send_modify(|v| *v = v.wrapping_add(1));
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchedulerError;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDriver {
        events: Mutex<Vec<String>>,
    }

    impl RecordingDriver {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl Driver for RecordingDriver {
        fn launch_task(&self, offer_id: &str, task: &dfsgrid_node::TaskSpec) -> anyhow::Result<()> {
            self.events
                .lock()
                .unwrap()
                .push(format!("launch {offer_id} {}", task.name));
            Ok(())
        }

        fn kill_task(&self, task_id: &str) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(format!("kill {task_id}"));
            Ok(())
        }

        fn decline_offer(&self, offer_id: &str) -> anyhow::Result<()> {
            self.events
                .lock()
                .unwrap()
                .push(format!("decline {offer_id}"));
            Ok(())
        }
    }

    fn make_scheduler() -> (Arc<Scheduler>, Arc<RecordingDriver>) {
        let driver = Arc::new(RecordingDriver::default());
        let scheduler = Arc::new(Scheduler::new(driver.clone(), Nodes::default(), None));
        (scheduler, driver)
    }

    fn make_offer(id: &str) -> Offer {
        Offer {
            id: id.into(),
            framework_id: "fw".into(),
            slave_id: "slave".into(),
            hostname: "host".into(),
            cpus: 4.0,
            mem: 4096,
            ports: vec!["31000..32000".parse().unwrap()],
            attributes: BTreeMap::new(),
        }
    }

    async fn node(scheduler: &Scheduler, id: &str) -> Node {
        scheduler
            .list_nodes(id)
            .await
            .unwrap()
            .into_iter()
            .next()
            .unwrap()
    }

    #[tokio::test]
    async fn offer_launches_first_eligible_node() {
        let (scheduler, driver) = make_scheduler();
        scheduler
            .add_nodes("nn", NodeType::Namenode, &NodeOptions::default())
            .await
            .unwrap();
        scheduler
            .start_nodes("nn", Period::from_ms(0))
            .await
            .unwrap();

        assert!(scheduler.process_offer(&make_offer("o1"), 0).await.unwrap());

        let nn = node(&scheduler, "nn").await;
        assert_eq!(nn.state, NodeState::Starting);
        assert!(nn.runtime.is_some());
        assert!(nn.reservation.is_some());
        assert_eq!(driver.events(), vec!["launch o1 hdfs-nn"]);

        // a placed node takes no further offers
        assert!(!scheduler.process_offer(&make_offer("o2"), 0).await.unwrap());
        assert_eq!(driver.events()[1], "decline o2");
    }

    #[tokio::test]
    async fn offer_declined_when_nothing_matches() {
        let (scheduler, driver) = make_scheduler();
        scheduler
            .add_nodes("nn", NodeType::Namenode, &NodeOptions::default())
            .await
            .unwrap();

        // idle node is not a candidate
        assert!(!scheduler.process_offer(&make_offer("o1"), 0).await.unwrap());

        // starting node on a too-small offer is rejected with a reason
        scheduler
            .start_nodes("nn", Period::from_ms(0))
            .await
            .unwrap();
        let mut small = make_offer("o2");
        small.cpus = 0.1;
        assert!(!scheduler.process_offer(&small, 0).await.unwrap());

        assert_eq!(driver.events(), vec!["decline o1", "decline o2"]);
    }

    #[tokio::test]
    async fn offer_skips_node_inside_backoff_window() {
        let (scheduler, _) = make_scheduler();
        scheduler
            .add_nodes("nn", NodeType::Namenode, &NodeOptions::default())
            .await
            .unwrap();
        scheduler
            .start_nodes("nn", Period::from_ms(0))
            .await
            .unwrap();

        // fail once at t=0; default delay is 1m
        assert!(scheduler.process_offer(&make_offer("o1"), 0).await.unwrap());
        let nn = node(&scheduler, "nn").await;
        let update = TaskStatusUpdate::new(nn.runtime.unwrap().task_id, TaskState::Failed);
        scheduler.handle_task_status(&update, 0).await.unwrap();

        let nn = node(&scheduler, "nn").await;
        assert_eq!(nn.state, NodeState::Starting);
        assert_eq!(nn.failover.failures, 1);

        assert!(!scheduler
            .process_offer(&make_offer("o2"), 30_000)
            .await
            .unwrap());
        assert!(scheduler
            .process_offer(&make_offer("o3"), 60_000)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn running_status_promotes_and_records_affinity() {
        let (scheduler, _) = make_scheduler();
        scheduler
            .add_nodes("nn", NodeType::Namenode, &NodeOptions::default())
            .await
            .unwrap();
        scheduler
            .start_nodes("nn", Period::from_ms(0))
            .await
            .unwrap();
        scheduler
            .process_offer(&make_offer("o1"), 0)
            .await
            .unwrap();

        let task_id = node(&scheduler, "nn").await.runtime.unwrap().task_id;
        scheduler
            .handle_task_status(&TaskStatusUpdate::new(task_id, TaskState::Running), 0)
            .await
            .unwrap();

        let nn = node(&scheduler, "nn").await;
        assert_eq!(nn.state, NodeState::Running);
        assert_eq!(nn.stickiness.hostname.as_deref(), Some("host"));
    }

    #[tokio::test]
    async fn operator_stop_failure_is_not_counted() {
        let (scheduler, driver) = make_scheduler();
        scheduler
            .add_nodes("nn", NodeType::Namenode, &NodeOptions::default())
            .await
            .unwrap();
        scheduler
            .start_nodes("nn", Period::from_ms(0))
            .await
            .unwrap();
        scheduler
            .process_offer(&make_offer("o1"), 0)
            .await
            .unwrap();
        let task_id = node(&scheduler, "nn").await.runtime.unwrap().task_id;
        scheduler
            .handle_task_status(
                &TaskStatusUpdate::new(task_id.clone(), TaskState::Running),
                0,
            )
            .await
            .unwrap();

        let (status, _) = scheduler
            .stop_nodes("nn", Period::from_ms(0))
            .await
            .unwrap();
        assert_eq!(status, StartStopStatus::Scheduled);
        assert_eq!(node(&scheduler, "nn").await.state, NodeState::Stopping);
        assert!(driver.events().contains(&format!("kill {task_id}")));

        // even a Lost report during an operator stop lands the node idle
        scheduler
            .handle_task_status(&TaskStatusUpdate::new(task_id, TaskState::Lost), 0)
            .await
            .unwrap();

        let nn = node(&scheduler, "nn").await;
        assert_eq!(nn.state, NodeState::Idle);
        assert_eq!(nn.failover.failures, 0);
        assert!(nn.runtime.is_none());
        assert!(nn.reservation.is_none());
    }

    #[tokio::test]
    async fn max_tries_parks_the_node_idle() {
        let (scheduler, _) = make_scheduler();
        let options = NodeOptions {
            failover_delay: Some(Period::from_ms(0)),
            failover_max_tries: Some(Some(2)),
            ..Default::default()
        };
        scheduler
            .add_nodes("nn", NodeType::Namenode, &options)
            .await
            .unwrap();
        scheduler
            .start_nodes("nn", Period::from_ms(0))
            .await
            .unwrap();

        for attempt in 0..2u64 {
            assert!(scheduler
                .process_offer(&make_offer("o"), attempt)
                .await
                .unwrap());
            let task_id = node(&scheduler, "nn").await.runtime.unwrap().task_id;
            scheduler
                .handle_task_status(&TaskStatusUpdate::new(task_id, TaskState::Error), attempt)
                .await
                .unwrap();
        }

        let nn = node(&scheduler, "nn").await;
        assert_eq!(nn.failover.failures, 2);
        assert_eq!(nn.state, NodeState::Idle);
    }

    #[tokio::test]
    async fn unknown_task_status_triggers_kill() {
        let (scheduler, driver) = make_scheduler();
        scheduler
            .handle_task_status(&TaskStatusUpdate::new("ghost", TaskState::Running), 0)
            .await
            .unwrap();
        assert_eq!(driver.events(), vec!["kill ghost"]);
    }

    #[tokio::test]
    async fn stop_without_runtime_goes_straight_idle() {
        let (scheduler, driver) = make_scheduler();
        scheduler
            .add_nodes("dn0..1", NodeType::Datanode, &NodeOptions::default())
            .await
            .unwrap();
        scheduler
            .start_nodes("dn0..1", Period::from_ms(0))
            .await
            .unwrap();

        let (status, stopped) = scheduler
            .stop_nodes("dn0..1", Period::from_ms(0))
            .await
            .unwrap();
        assert_eq!(status, StartStopStatus::Scheduled);
        assert_eq!(stopped.len(), 2);
        assert!(stopped.iter().all(|n| n.state == NodeState::Idle));
        assert!(driver.events().is_empty());
    }

    #[tokio::test]
    async fn add_validates_every_id_before_creating_any() {
        let (scheduler, _) = make_scheduler();
        scheduler
            .add_nodes("dn1", NodeType::Datanode, &NodeOptions::default())
            .await
            .unwrap();

        let err = scheduler
            .add_nodes("dn0..2", NodeType::Datanode, &NodeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Node(NodeError::Duplicate(id)) if id == "dn1"
        ));
        // nothing from the failed batch leaked in
        assert_eq!(scheduler.list_nodes("*").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lifecycle_validation_errors() {
        let (scheduler, _) = make_scheduler();
        scheduler
            .add_nodes("nn", NodeType::Namenode, &NodeOptions::default())
            .await
            .unwrap();

        assert!(matches!(
            scheduler
                .start_nodes("missing", Period::from_ms(0))
                .await
                .unwrap_err(),
            SchedulerError::Node(NodeError::NotFound(_))
        ));
        assert!(matches!(
            scheduler
                .stop_nodes("nn", Period::from_ms(0))
                .await
                .unwrap_err(),
            SchedulerError::Node(NodeError::Idle(_))
        ));

        scheduler
            .start_nodes("nn", Period::from_ms(0))
            .await
            .unwrap();
        assert!(matches!(
            scheduler
                .start_nodes("nn", Period::from_ms(0))
                .await
                .unwrap_err(),
            SchedulerError::Node(NodeError::NotIdle(_))
        ));
        assert!(matches!(
            scheduler.remove_nodes("nn").await.unwrap_err(),
            SchedulerError::Node(NodeError::NotIdle(_))
        ));
        assert!(matches!(
            scheduler
                .update_nodes("nn", &NodeOptions::default())
                .await
                .unwrap_err(),
            SchedulerError::Node(NodeError::NotIdle(_))
        ));
    }

    #[tokio::test]
    async fn external_namenode_cannot_start_or_stop() {
        let (scheduler, _) = make_scheduler();
        let options = NodeOptions {
            external_fs_uri: Some(Some("hdfs://external:8020".into())),
            ..Default::default()
        };
        scheduler
            .add_nodes("nn", NodeType::Namenode, &options)
            .await
            .unwrap();

        assert!(matches!(
            scheduler
                .start_nodes("nn", Period::from_ms(0))
                .await
                .unwrap_err(),
            SchedulerError::Node(NodeError::External(_))
        ));
        assert!(matches!(
            scheduler
                .stop_nodes("nn", Period::from_ms(0))
                .await
                .unwrap_err(),
            SchedulerError::Node(NodeError::External(_))
        ));
    }

    #[tokio::test]
    async fn external_fs_uri_only_sticks_on_namenodes() {
        let (scheduler, _) = make_scheduler();
        let options = NodeOptions {
            external_fs_uri: Some(Some("hdfs://external:8020".into())),
            ..Default::default()
        };
        scheduler
            .add_nodes("nn", NodeType::Namenode, &options)
            .await
            .unwrap();
        let added = scheduler
            .add_nodes("dn", NodeType::Datanode, &options)
            .await
            .unwrap();

        assert!(node(&scheduler, "nn").await.external_fs_uri.is_some());
        assert!(added[0].external_fs_uri.is_none());
    }

    #[tokio::test]
    async fn update_applies_options_to_idle_nodes() {
        let (scheduler, _) = make_scheduler();
        scheduler
            .add_nodes("dn0..2", NodeType::Datanode, &NodeOptions::default())
            .await
            .unwrap();

        let options = NodeOptions {
            cpus: Some(2.0),
            mem: Some(2048),
            ..Default::default()
        };
        let updated = scheduler.update_nodes("dn0..2", &options).await.unwrap();
        assert_eq!(updated.len(), 3);
        assert!(updated.iter().all(|n| n.cpus == 2.0 && n.mem == 2048));
    }

    #[tokio::test]
    async fn list_filters_range_to_existing_nodes() {
        let (scheduler, _) = make_scheduler();
        scheduler
            .add_nodes("dn0,dn2", NodeType::Datanode, &NodeOptions::default())
            .await
            .unwrap();

        let listed = scheduler.list_nodes("dn0..5").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["dn0", "dn2"]);

        assert_eq!(scheduler.list_nodes("*").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn remove_returns_removed_ids() {
        let (scheduler, _) = make_scheduler();
        scheduler
            .add_nodes("dn0..2", NodeType::Datanode, &NodeOptions::default())
            .await
            .unwrap();

        let removed = scheduler.remove_nodes("dn0,dn1").await.unwrap();
        assert_eq!(removed, vec!["dn0", "dn1"]);
        assert_eq!(scheduler.list_nodes("*").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn start_wait_resolves_once_node_runs() {
        let (scheduler, _) = make_scheduler();
        scheduler
            .add_nodes("nn", NodeType::Namenode, &NodeOptions::default())
            .await
            .unwrap();

        let background = scheduler.clone();
        let feeder = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            background
                .process_offer(&make_offer("o1"), 0)
                .await
                .unwrap();
            let task_id = node(&background, "nn").await.runtime.unwrap().task_id;
            background
                .handle_task_status(&TaskStatusUpdate::new(task_id, TaskState::Running), 0)
                .await
                .unwrap();
        });

        let (status, started) = scheduler
            .start_nodes("nn", "5s".parse().unwrap())
            .await
            .unwrap();
        feeder.await.unwrap();

        assert_eq!(status, StartStopStatus::Started);
        assert_eq!(started[0].state, NodeState::Running);
    }

    #[tokio::test]
    async fn start_wait_times_out_without_aborting() {
        let (scheduler, _) = make_scheduler();
        scheduler
            .add_nodes("nn", NodeType::Namenode, &NodeOptions::default())
            .await
            .unwrap();

        let (status, nodes) = scheduler
            .start_nodes("nn", "20ms".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(status, StartStopStatus::Timeout);
        // the transition survives the timed-out wait
        assert_eq!(nodes[0].state, NodeState::Starting);
    }

    #[tokio::test]
    async fn snapshot_saved_after_mutations() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nodes.json"));
        let driver = Arc::new(RecordingDriver::default());
        let scheduler = Scheduler::new(driver, Nodes::default(), Some(storage.clone()));

        scheduler
            .add_nodes("nn", NodeType::Namenode, &NodeOptions::default())
            .await
            .unwrap();
        scheduler
            .start_nodes("nn", Period::from_ms(0))
            .await
            .unwrap();

        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded.get("nn").unwrap().state, NodeState::Starting);
    }

    #[tokio::test]
    async fn status_serializes_lowercase() {
        let json = serde_json::to_string(&StartStopStatus::Scheduled).unwrap();
        assert_eq!(json, "\"scheduled\"");
        let json = serde_json::to_string(&StartStopStatus::Timeout).unwrap();
        assert_eq!(json, "\"timeout\"");
    }
}
