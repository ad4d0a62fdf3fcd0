//! The node registry.
//!
//! An insertion-ordered collection of all managed nodes, keyed by unique id,
//! plus the id-expression expansion used to address groups of nodes
//! (`"nn"`, `"dn0,dn1"`, `"dn0..2"`, `"*"`). The registry is plain data —
//! ownership and locking live with the scheduler that holds it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{NodeError, NodeResult};
use crate::node::{Node, NodeType};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nodes {
    nodes: Vec<Node>,
}

impl Nodes {
    /// Add a node, rejecting a duplicate id.
    pub fn add(&mut self, node: Node) -> NodeResult<&mut Node> {
        if self.get(&node.id).is_some() {
            return Err(NodeError::Duplicate(node.id));
        }
        self.nodes.push(node);
        // push guarantees a last element
        Ok(self.nodes.last_mut().unwrap())
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Remove a node by id. The caller validates lifecycle state.
    pub fn remove(&mut self, id: &str) -> NodeResult<Node> {
        let idx = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| NodeError::NotFound(id.to_string()))?;
        Ok(self.nodes.remove(idx))
    }

    pub fn all(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn namenodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind == NodeType::Namenode)
    }

    /// Find the node owning a launched task.
    pub fn find_by_task_id(&self, task_id: &str) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| n.runtime.as_ref().is_some_and(|r| r.task_id == task_id))
    }

    /// Attribute values of all placed nodes other than `exclude_id`,
    /// keyed by attribute name. Feeds groupBy balancing.
    pub fn other_attributes(&self, exclude_id: &str) -> BTreeMap<String, Vec<String>> {
        let mut result: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for node in &self.nodes {
            if node.id == exclude_id {
                continue;
            }
            let Some(runtime) = &node.runtime else {
                continue;
            };
            for (name, value) in &runtime.attributes {
                result.entry(name.clone()).or_default().push(value.clone());
            }
        }
        result
    }

    /// Expand an id expression into concrete ids.
    ///
    /// Supported tokens, comma-separated: an exact id, a numeric range with
    /// an optional shared prefix (`0..2`, `dn0..2`), and `*` for every
    /// registered id (insertion order). Ranges are syntactic — the produced
    /// ids need not exist, so the same expression addresses `add`.
    pub fn expand_expr(&self, expr: &str) -> NodeResult<Vec<String>> {
        let invalid = || NodeError::InvalidExpr(expr.to_string());

        let mut ids: Vec<String> = Vec::new();
        for token in expr.split(',') {
            let token = token.trim();
            if token.is_empty() {
                return Err(invalid());
            }
            if token == "*" {
                ids.extend(self.nodes.iter().map(|n| n.id.clone()));
                continue;
            }
            match token.split_once("..") {
                Some((left, right)) => {
                    let digits_start = left
                        .find(|c: char| c.is_ascii_digit())
                        .ok_or_else(invalid)?;
                    let (prefix, start) = left.split_at(digits_start);
                    let start: u64 = start.parse().map_err(|_| invalid())?;
                    let end: u64 = right.parse().map_err(|_| invalid())?;
                    if start > end {
                        return Err(invalid());
                    }
                    for i in start..=end {
                        ids.push(format!("{prefix}{i}"));
                    }
                }
                None => ids.push(token.to_string()),
            }
        }

        // A token may repeat what "*" already produced.
        let mut seen = std::collections::HashSet::new();
        ids.retain(|id| seen.insert(id.clone()));
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(ids: &[&str]) -> Nodes {
        let mut nodes = Nodes::default();
        for id in ids {
            nodes.add(Node::new(*id, NodeType::Datanode)).unwrap();
        }
        nodes
    }

    #[test]
    fn add_rejects_duplicate_id() {
        let mut nodes = registry(&["0"]);
        let err = nodes.add(Node::new("0", NodeType::Namenode)).unwrap_err();
        assert!(matches!(err, NodeError::Duplicate(id) if id == "0"));
    }

    #[test]
    fn remove_unknown_fails() {
        let mut nodes = registry(&["0"]);
        assert!(matches!(
            nodes.remove("1"),
            Err(NodeError::NotFound(id)) if id == "1"
        ));
        assert_eq!(nodes.remove("0").unwrap().id, "0");
        assert!(nodes.is_empty());
    }

    #[test]
    fn expand_exact_and_list() {
        let nodes = registry(&[]);
        assert_eq!(nodes.expand_expr("nn").unwrap(), vec!["nn"]);
        assert_eq!(
            nodes.expand_expr("nn,dn0,dn1").unwrap(),
            vec!["nn", "dn0", "dn1"]
        );
    }

    #[test]
    fn expand_numeric_range_with_optional_prefix() {
        let nodes = registry(&[]);
        assert_eq!(nodes.expand_expr("0..2").unwrap(), vec!["0", "1", "2"]);
        assert_eq!(
            nodes.expand_expr("dn0..2").unwrap(),
            vec!["dn0", "dn1", "dn2"]
        );
    }

    #[test]
    fn expand_wildcard_in_insertion_order() {
        let nodes = registry(&["nn", "dn1", "dn0"]);
        assert_eq!(nodes.expand_expr("*").unwrap(), vec!["nn", "dn1", "dn0"]);
    }

    #[test]
    fn expand_dedups_repeated_ids() {
        let nodes = registry(&["nn"]);
        assert_eq!(nodes.expand_expr("nn,nn,*").unwrap(), vec!["nn"]);
    }

    #[test]
    fn expand_rejects_malformed() {
        let nodes = registry(&[]);
        for expr in ["", ",", "a..b", "2..1", "..", "x..", "5..y"] {
            assert!(
                matches!(nodes.expand_expr(expr), Err(NodeError::InvalidExpr(_))),
                "expected rejection for {expr:?}"
            );
        }
    }

    #[test]
    fn other_attributes_collects_placed_values() {
        let mut nodes = registry(&["a", "b", "c"]);
        for (id, rack) in [("a", "r1"), ("b", "r2")] {
            let node = nodes.get_mut(id).unwrap();
            node.runtime = Some(crate::node::Runtime {
                task_id: format!("t-{id}"),
                executor_id: format!("e-{id}"),
                slave_id: "s".into(),
                hostname: "h".into(),
                attributes: BTreeMap::from([("rack".to_string(), rack.to_string())]),
                fs_uri: "hdfs://h:0".into(),
                kill_sent: false,
            });
        }

        let observed = nodes.other_attributes("c");
        assert_eq!(
            observed.get("rack"),
            Some(&vec!["r1".to_string(), "r2".to_string()])
        );

        // the candidate's own placement is excluded
        let observed = nodes.other_attributes("a");
        assert_eq!(observed.get("rack"), Some(&vec!["r2".to_string()]));
    }

    #[test]
    fn find_by_task_id() {
        let mut nodes = registry(&["a"]);
        assert!(nodes.find_by_task_id("t-a").is_none());

        nodes.get_mut("a").unwrap().runtime = Some(crate::node::Runtime {
            task_id: "t-a".into(),
            executor_id: "e-a".into(),
            slave_id: "s".into(),
            hostname: "h".into(),
            attributes: BTreeMap::new(),
            fs_uri: "hdfs://h:0".into(),
            kill_sent: false,
        });
        assert_eq!(nodes.find_by_task_id("t-a").unwrap().id, "a");
    }
}
