//! Restart-after-failure policy with exponential backoff.

use serde::{Deserialize, Serialize};

use dfsgrid_core::Period;

/// Per-node exponential backoff state.
///
/// After the n-th failure the node must wait `min(delay * 2^(n-1), max_delay)`
/// before it is offered capacity again. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failover {
    pub delay: Period,
    pub max_delay: Period,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tries: Option<u32>,
    #[serde(default)]
    pub failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_time: Option<u64>,
}

impl Default for Failover {
    fn default() -> Self {
        Self::new(Period::from_ms(60_000), Period::from_ms(600_000))
    }
}

impl Failover {
    pub fn new(delay: Period, max_delay: Period) -> Self {
        Self {
            delay,
            max_delay,
            max_tries: None,
            failures: 0,
            failure_time: None,
        }
    }

    /// Backoff owed for the current failure count, clamped to `max_delay`.
    ///
    /// The doubling is clamped before the product is materialized, so the
    /// result stays exact for arbitrarily large failure counts.
    pub fn current_delay(&self) -> Period {
        if self.failures == 0 {
            return Period::from_ms(0);
        }
        let base = self.delay.ms();
        if base == 0 {
            return Period::from_ms(0);
        }
        let max = self.max_delay.ms();
        let exp = u64::from(self.failures - 1);
        let ms = if exp >= u64::BITS as u64 || base > max >> exp {
            max
        } else {
            (base << exp).min(max)
        };
        Period::from_ms(ms)
    }

    /// Instant (epoch ms) at which the current backoff elapses.
    pub fn delay_expires(&self) -> u64 {
        self.failure_time
            .unwrap_or(0)
            .saturating_add(self.current_delay().ms())
    }

    pub fn is_waiting_delay(&self, now: u64) -> bool {
        now < self.delay_expires()
    }

    pub fn is_max_tries_exceeded(&self) -> bool {
        self.max_tries.is_some_and(|max| self.failures >= max)
    }

    pub fn register_failure(&mut self, now: u64) {
        self.failures += 1;
        self.failure_time = Some(now);
    }

    pub fn reset_failures(&mut self) {
        self.failures = 0;
        self.failure_time = None;
    }
}
