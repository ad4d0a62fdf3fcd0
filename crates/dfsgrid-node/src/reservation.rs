//! Reservations and the disjoint-interval port allocator.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use dfsgrid_core::PortRange;

/// The two named ports every HDFS process needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    Http,
    Ipc,
}

/// The exact resource slice carved out of one accepted offer.
///
/// `ports` is populated only for a complete reservation, i.e. when both
/// cpus and mem match the node's full target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub cpus: f64,
    pub mem: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ports: BTreeMap<PortKind, u32>,
}

impl Reservation {
    /// Render as a resource string for task descriptors,
    /// e.g. `cpus:0.5;mem:500;ports:1000..1000`.
    pub fn to_resources(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if self.cpus > 0.0 {
            parts.push(format!("cpus:{}", self.cpus));
        }
        if self.mem > 0 {
            parts.push(format!("mem:{}", self.mem));
        }
        if !self.ports.is_empty() {
            let mut s = String::from("ports:");
            for (i, port) in self.ports.values().enumerate() {
                if i > 0 {
                    s.push(',');
                }
                let _ = write!(s, "{port}..{port}");
            }
            parts.push(s);
        }
        parts.join(";")
    }
}

/// Carve the lowest port common to `desired` and `free` out of `free`.
///
/// Scans `free` in order for the first range intersecting `desired`; the
/// chosen port is the low end of the overlap. The consumed range is replaced
/// in place by its zero, one, or two non-empty remainders, so the list stays
/// disjoint and ascending. Adjacent remainders are never coalesced, keeping
/// allocation order deterministic (lowest port first).
pub fn reserve_port(desired: &PortRange, free: &mut Vec<PortRange>) -> Option<u32> {
    for i in 0..free.len() {
        let range = free[i];
        let Some(overlap) = range.overlap(desired) else {
            continue;
        };
        let port = overlap.start;

        let mut remainders = Vec::with_capacity(2);
        if range.start < port {
            remainders.push(PortRange {
                start: range.start,
                end: port - 1,
            });
        }
        if port < range.end {
            remainders.push(PortRange {
                start: port + 1,
                end: range.end,
            });
        }
        free.splice(i..=i, remainders);
        return Some(port);
    }
    None
}
