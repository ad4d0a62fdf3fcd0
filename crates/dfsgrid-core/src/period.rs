//! Human-readable durations with millisecond precision.
//!
//! Periods are parsed from strings like `"500ms"`, `"1s"`, `"5m"`, `"2h"`,
//! `"1d"` (a bare number is milliseconds) and display as the largest unit
//! that divides the value evenly, so parse→display→parse is the identity
//! on the underlying millisecond count.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A non-negative duration, stored as whole milliseconds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    ms: u64,
}

impl Period {
    pub const fn from_ms(ms: u64) -> Self {
        Self { ms }
    }

    pub const fn ms(&self) -> u64 {
        self.ms
    }

    pub const fn is_zero(&self) -> bool {
        self.ms == 0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.ms)
    }
}

impl FromStr for Period {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidPeriod(s.to_string());

        let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (value, unit) = s.split_at(digits_end);
        let value: u64 = value.parse().map_err(|_| invalid())?;

        let scale = match unit {
            "" | "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            _ => return Err(invalid()),
        };

        let ms = value.checked_mul(scale).ok_or_else(invalid)?;
        Ok(Self { ms })
    }
}

impl TryFrom<String> for Period {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Period> for String {
    fn from(p: Period) -> Self {
        p.to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.ms;
        if ms == 0 {
            return write!(f, "0ms");
        }
        for (scale, unit) in [
            (86_400_000, "d"),
            (3_600_000, "h"),
            (60_000, "m"),
            (1_000, "s"),
        ] {
            if ms % scale == 0 {
                return write!(f, "{}{unit}", ms / scale);
            }
        }
        write!(f, "{ms}ms")
    }
}
