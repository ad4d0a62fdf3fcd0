//! Host-affinity ("stickiness") policy.
//!
//! After a node stops, placement keeps favoring its previous host for an
//! affinity window, so a restart lands where the data already is.

use serde::{Deserialize, Serialize};

use dfsgrid_core::Period;

/// Per-node host affinity state. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stickiness {
    /// Affinity window after a stop.
    pub period: Period,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_time: Option<u64>,
    /// Whether the hostname survives a stop. When false the policy goes
    /// inert for the next placement.
    #[serde(default = "default_persist")]
    pub persist: bool,
}

fn default_persist() -> bool {
    true
}

impl Default for Stickiness {
    fn default() -> Self {
        Self {
            // 30m affinity window.
            period: Period::from_ms(1_800_000),
            hostname: None,
            stop_time: None,
            persist: true,
        }
    }
}

impl Stickiness {
    /// Whether placement on `hostname` is allowed at `now`.
    ///
    /// Allowed when no host was ever recorded, when it is the recorded host,
    /// when no stop has been recorded since the last start, or when the
    /// affinity window has elapsed.
    pub fn allows_hostname(&self, hostname: &str, now: u64) -> bool {
        let Some(recorded) = &self.hostname else {
            return true;
        };
        if recorded == hostname {
            return true;
        }
        match self.stop_time {
            None => true,
            Some(stop) => now >= stop.saturating_add(self.period.ms()),
        }
    }

    pub fn register_start(&mut self, hostname: &str) {
        self.hostname = Some(hostname.to_string());
        self.stop_time = None;
    }

    pub fn register_stop(&mut self, now: u64, persist: bool) {
        self.stop_time = Some(now);
        if !persist {
            self.hostname = None;
        }
    }
}
