//! dfsgrid-core — shared primitives for the dfsgrid scheduler.
//!
//! Everything here is plain data used across the workspace: human-readable
//! durations ([`Period`]), inclusive port intervals ([`PortRange`]),
//! resource-manager offers ([`Offer`]), key=value option parsing, and the
//! daemon TOML config.

pub mod config;
pub mod error;
pub mod offer;
pub mod parse;
pub mod period;
pub mod range;

pub use config::DaemonConfig;
pub use error::{CoreError, CoreResult};
pub use offer::Offer;
pub use parse::{format_map, parse_map};
pub use period::Period;
pub use range::PortRange;
