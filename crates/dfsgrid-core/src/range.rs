//! Inclusive port intervals.
//!
//! Offers carry their free ports as an ascending list of disjoint
//! [`PortRange`]s; the reservation logic carves single ports out of that
//! list. Ranges parse from `"lo..hi"` or a single `"port"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// An inclusive `[start, end]` interval of port numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PortRange {
    pub start: u32,
    pub end: u32,
}

impl PortRange {
    /// Build a range, rejecting `start > end`.
    pub fn new(start: u32, end: u32) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidRange(format!("{start}..{end}")));
        }
        Ok(Self { start, end })
    }

    pub const fn single(port: u32) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    /// Number of ports covered by this range.
    pub const fn count(&self) -> u64 {
        (self.end - self.start) as u64 + 1
    }

    pub const fn contains(&self, port: u32) -> bool {
        self.start <= port && port <= self.end
    }

    /// The common sub-range of two ranges, if any.
    pub fn overlap(&self, other: &PortRange) -> Option<PortRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(PortRange { start, end })
    }
}

impl FromStr for PortRange {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidRange(s.to_string());
        match s.split_once("..") {
            Some((lo, hi)) => {
                let start = lo.parse().map_err(|_| invalid())?;
                let end = hi.parse().map_err(|_| invalid())?;
                Self::new(start, end).map_err(|_| invalid())
            }
            None => {
                let port = s.parse().map_err(|_| invalid())?;
                Ok(Self::single(port))
            }
        }
    }
}

impl TryFrom<String> for PortRange {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PortRange> for String {
    fn from(r: PortRange) -> Self {
        r.to_string()
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}..{}", self.start, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_range_and_single() {
        assert_eq!("0..100".parse::<PortRange>().unwrap(), PortRange { start: 0, end: 100 });
        assert_eq!("31000".parse::<PortRange>().unwrap(), PortRange::single(31000));
    }

    #[test]
    fn rejects_inverted_and_garbage() {
        assert!("10..5".parse::<PortRange>().is_err());
        assert!("a..b".parse::<PortRange>().is_err());
        assert!("".parse::<PortRange>().is_err());
    }

    #[test]
    fn overlap_of_ranges() {
        let r = PortRange { start: 10, end: 20 };
        assert_eq!(
            r.overlap(&PortRange { start: 15, end: 30 }),
            Some(PortRange { start: 15, end: 20 })
        );
        assert_eq!(
            r.overlap(&PortRange { start: 0, end: 65535 }),
            Some(r)
        );
        assert_eq!(r.overlap(&PortRange { start: 21, end: 30 }), None);
    }

    #[test]
    fn count_covers_inclusive_bounds() {
        assert_eq!(PortRange::single(5).count(), 1);
        assert_eq!(PortRange { start: 0, end: 100 }.count(), 101);
    }

    #[test]
    fn display_round_trips() {
        for s in ["0..100", "31000", "1..9"] {
            let r: PortRange = s.parse().unwrap();
            assert_eq!(r.to_string(), s);
        }
    }
}
