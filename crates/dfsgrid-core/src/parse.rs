//! `key=value` option-string parsing.
//!
//! The control plane passes several options as flat strings: site configs
//! as `"key=val,key=val"` and placement constraints as `"name=spec;name=spec"`.
//! Parsing preserves entry order — constraint evaluation order follows it.

use crate::error::{CoreError, CoreResult};

/// Parse a `key=value` list separated by `sep`, preserving entry order.
///
/// Empty input yields an empty list. Whitespace around entries is trimmed;
/// an entry without `=` or with an empty key is rejected. Values may be
/// empty (`"a="` maps `a` to `""`).
pub fn parse_map(s: &str, sep: char) -> CoreResult<Vec<(String, String)>> {
    let mut entries = Vec::new();
    for part in s.split(sep) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| CoreError::InvalidMapEntry(part.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(CoreError::InvalidMapEntry(part.to_string()));
        }
        entries.push((key.to_string(), value.trim().to_string()));
    }
    Ok(entries)
}

/// Render entries back to a `key=value` list.
pub fn format_map<'a, I>(entries: I, sep: char) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    entries
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(&sep.to_string())
}
