//! dfsgrid.toml daemon configuration parser.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub framework: FrameworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Listen address for the REST API.
    pub addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the node-registry snapshot file.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkConfig {
    /// Framework name registered with the resource manager.
    pub name: String,
    pub user: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:7000".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/lib/dfsgrid/nodes.json"),
        }
    }
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            name: "dfsgrid".to_string(),
            user: None,
        }
    }
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DaemonConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal() {
        let config: DaemonConfig = toml::from_str("").unwrap();
        assert_eq!(config.api.addr, "0.0.0.0:7000");
        assert_eq!(config.framework.name, "dfsgrid");
    }

    #[test]
    fn parse_overrides() {
        let toml_str = r#"
[api]
addr = "127.0.0.1:9000"

[framework]
name = "hdfs-prod"
user = "hdfs"
"#;
        let config: DaemonConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.addr, "127.0.0.1:9000");
        assert_eq!(config.framework.name, "hdfs-prod");
        assert_eq!(config.framework.user.as_deref(), Some("hdfs"));
    }
}
