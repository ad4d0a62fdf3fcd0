//! Placement constraints over offer attributes.
//!
//! A constraint is a single predicate over one attribute value, parsed once
//! from its spec string at the boundary and kept in validated form:
//!
//! - `like:<regex>` — the value must fully match the regex
//! - `unlike:<regex>` — negation of `like`
//! - `groupBy[:N]` — spread nodes across N attribute values (default 1),
//!   balancing by the population counts of values already placed

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::NodeError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Constraint {
    Like { pattern: String, regex: Regex },
    Unlike { pattern: String, regex: Regex },
    GroupBy { groups: usize },
}

impl Constraint {
    /// Evaluate the predicate for `value`, given the attribute values of all
    /// other placed nodes.
    ///
    /// `groupBy` balances by occurrence counts: with no observations any
    /// value matches; while fewer than N distinct values are in use, only a
    /// value that starts a new group matches; after that, only values tied
    /// for the minimum count match (every value at the minimum is allowed).
    pub fn matches(&self, value: &str, others: &[String]) -> bool {
        match self {
            Constraint::Like { regex, .. } => regex.is_match(value),
            Constraint::Unlike { regex, .. } => !regex.is_match(value),
            Constraint::GroupBy { groups } => {
                let mut counts: HashMap<&str, usize> = HashMap::new();
                for v in others {
                    *counts.entry(v.as_str()).or_insert(0) += 1;
                }
                if counts.is_empty() {
                    return true;
                }
                if counts.len() < *groups {
                    return !counts.contains_key(value);
                }
                let min = counts.values().copied().min().unwrap_or(0);
                counts.get(value).copied().unwrap_or(0) == min
            }
        }
    }
}

fn full_match_regex(pattern: &str) -> Result<Regex, NodeError> {
    // Anchor so `like` means "fully matches", not "contains".
    Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|e| NodeError::InvalidConstraint(e.to_string()))
}

impl FromStr for Constraint {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(pattern) = s.strip_prefix("like:") {
            return Ok(Constraint::Like {
                pattern: pattern.to_string(),
                regex: full_match_regex(pattern)?,
            });
        }
        if let Some(pattern) = s.strip_prefix("unlike:") {
            return Ok(Constraint::Unlike {
                pattern: pattern.to_string(),
                regex: full_match_regex(pattern)?,
            });
        }
        if s == "groupBy" {
            return Ok(Constraint::GroupBy { groups: 1 });
        }
        if let Some(n) = s.strip_prefix("groupBy:") {
            let groups: usize = n
                .parse()
                .map_err(|_| NodeError::InvalidConstraint(s.to_string()))?;
            if groups == 0 {
                return Err(NodeError::InvalidConstraint(s.to_string()));
            }
            return Ok(Constraint::GroupBy { groups });
        }
        Err(NodeError::InvalidConstraint(s.to_string()))
    }
}

impl TryFrom<String> for Constraint {
    type Error = NodeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Constraint> for String {
    fn from(c: Constraint) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Like { pattern, .. } => write!(f, "like:{pattern}"),
            Constraint::Unlike { pattern, .. } => write!(f, "unlike:{pattern}"),
            Constraint::GroupBy { groups: 1 } => write!(f, "groupBy"),
            Constraint::GroupBy { groups } => write!(f, "groupBy:{groups}"),
        }
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constraint::Like { pattern: a, .. }, Constraint::Like { pattern: b, .. }) => a == b,
            (Constraint::Unlike { pattern: a, .. }, Constraint::Unlike { pattern: b, .. }) => {
                a == b
            }
            (Constraint::GroupBy { groups: a }, Constraint::GroupBy { groups: b }) => a == b,
            _ => false,
        }
    }
}

impl Eq for Constraint {}
