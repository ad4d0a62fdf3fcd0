//! Registry snapshot storage.
//!
//! The whole registry serializes to one JSON document; a save replaces the
//! snapshot atomically (write to a temp file, then rename). What triggers a
//! save is the scheduler's business — this module only guarantees the
//! snapshot is lossless.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::NodeResult;
use crate::registry::Nodes;

#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the registry, replacing any previous snapshot atomically.
    pub fn save(&self, nodes: &Nodes) -> NodeResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(nodes)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = ?self.path, nodes = nodes.len(), "registry snapshot saved");
        Ok(())
    }

    /// Load the last snapshot; `None` when no snapshot exists yet.
    pub fn load(&self) -> NodeResult<Option<Nodes>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let nodes: Nodes = serde_json::from_str(&json)?;
        Ok(Some(nodes))
    }
}
