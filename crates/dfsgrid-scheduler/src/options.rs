//! Operator-supplied node settings.
//!
//! Every field is optional; an absent field leaves the node's current value
//! alone, so the same struct serves both `add` (applied onto defaults) and
//! `update`. Double-`Option` fields distinguish "not mentioned" from an
//! explicit clear.

use std::collections::BTreeMap;

use dfsgrid_core::Period;
use dfsgrid_node::{Constraint, Node};

#[derive(Debug, Clone, Default)]
pub struct NodeOptions {
    pub cpus: Option<f64>,
    pub mem: Option<u64>,
    pub constraints: Option<Vec<(String, Constraint)>>,

    pub executor_jvm_opts: Option<Option<String>>,
    pub hadoop_jvm_opts: Option<Option<String>>,
    pub core_site_opts: Option<BTreeMap<String, String>>,
    pub hdfs_site_opts: Option<BTreeMap<String, String>>,

    pub external_fs_uri: Option<Option<String>>,

    pub failover_delay: Option<Period>,
    pub failover_max_delay: Option<Period>,
    pub failover_max_tries: Option<Option<u32>>,

    pub stickiness_period: Option<Period>,
    pub stickiness_hostname: Option<Option<String>>,
    pub stickiness_persist: Option<bool>,
}

impl NodeOptions {
    /// Apply every present field onto `node`.
    pub fn apply(&self, node: &mut Node) {
        if let Some(cpus) = self.cpus {
            node.cpus = cpus;
        }
        if let Some(mem) = self.mem {
            node.mem = mem;
        }
        if let Some(constraints) = &self.constraints {
            node.constraints = constraints.clone();
        }
        if let Some(opts) = &self.executor_jvm_opts {
            node.executor_jvm_opts = opts.clone();
        }
        if let Some(opts) = &self.hadoop_jvm_opts {
            node.hadoop_jvm_opts = opts.clone();
        }
        if let Some(opts) = &self.core_site_opts {
            node.core_site_opts = opts.clone();
        }
        if let Some(opts) = &self.hdfs_site_opts {
            node.hdfs_site_opts = opts.clone();
        }
        if let Some(uri) = &self.external_fs_uri {
            node.external_fs_uri = uri.clone();
        }
        if let Some(delay) = self.failover_delay {
            node.failover.delay = delay;
        }
        if let Some(max_delay) = self.failover_max_delay {
            node.failover.max_delay = max_delay;
        }
        if let Some(max_tries) = self.failover_max_tries {
            node.failover.max_tries = max_tries;
        }
        if let Some(period) = self.stickiness_period {
            node.stickiness.period = period;
        }
        if let Some(hostname) = &self.stickiness_hostname {
            node.stickiness.hostname = hostname.clone();
        }
        if let Some(persist) = self.stickiness_persist {
            node.stickiness.persist = persist;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dfsgrid_node::NodeType;

    #[test]
    fn empty_options_change_nothing() {
        let mut node = Node::new("0", NodeType::Namenode);
        let before = node.clone();
        NodeOptions::default().apply(&mut node);
        assert_eq!(node, before);
    }

    #[test]
    fn present_fields_overwrite() {
        let mut node = Node::new("0", NodeType::Namenode);
        node.executor_jvm_opts = Some("-Xmx100m".into());

        let options = NodeOptions {
            cpus: Some(2.0),
            mem: Some(2048),
            executor_jvm_opts: Some(None),
            external_fs_uri: Some(Some("hdfs://external:8020".into())),
            failover_max_tries: Some(Some(5)),
            stickiness_period: Some("1h".parse().unwrap()),
            ..Default::default()
        };
        options.apply(&mut node);

        assert_eq!(node.cpus, 2.0);
        assert_eq!(node.mem, 2048);
        assert_eq!(node.executor_jvm_opts, None);
        assert_eq!(node.external_fs_uri.as_deref(), Some("hdfs://external:8020"));
        assert_eq!(node.failover.max_tries, Some(5));
        assert_eq!(node.stickiness.period.ms(), 3_600_000);
    }
}
