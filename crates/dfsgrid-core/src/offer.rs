//! Resource offers as delivered by the resource-manager layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::range::PortRange;

/// A time-bounded bundle of one host's free capacity.
///
/// `ports` is an ascending list of disjoint free ranges; `attributes` are
/// the host's labelled attributes (rack, dc, ...) used by placement
/// constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    pub framework_id: String,
    pub slave_id: String,
    pub hostname: String,
    /// Free cpu share.
    pub cpus: f64,
    /// Free memory in MB.
    pub mem: u64,
    pub ports: Vec<PortRange>,
    pub attributes: BTreeMap<String, String>,
}
