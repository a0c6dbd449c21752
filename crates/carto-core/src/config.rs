//! Persistent configuration for carto.
//!
//! Loads/saves a TOML config at `~/.carto/config.toml`.

use crate::{CartoError, KindRegistry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level carto configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CartoConfig {
    pub storage: StorageConfig,
    pub index: IndexConfig,
    pub graph: GraphConfig,
}

impl CartoConfig {
    /// Load configuration from the given path.
    pub fn load(path: &Path) -> Result<Self, CartoError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CartoError::Config(e.to_string()))
    }

    /// Save configuration to the given path.
    pub fn save(&self, path: &Path) -> Result<(), CartoError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| CartoError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from the default path, or return defaults if the file doesn't exist.
    pub fn load_or_default() -> Self {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// Default config path: `~/.carto/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".carto")
            .join("config.toml")
    }

    /// Build a kind registry from the defaults plus configured extras.
    pub fn kind_registry(&self) -> Result<KindRegistry, CartoError> {
        let mut registry = KindRegistry::with_defaults();
        for kind in &self.graph.node_kinds {
            registry.register_node_kind(&kind.name, &kind.label, &kind.description)?;
        }
        for kind in &self.graph.edge_kinds {
            registry.register_edge_kind(&kind.name, &kind.label, &kind.description)?;
        }
        Ok(registry)
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    pub db_path: String,
    /// SQLite cache size in MB.
    pub cache_size_mb: u32,
    /// SQLite busy timeout in seconds.
    pub busy_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".carto")
                .join("carto.db")
                .to_string_lossy()
                .into_owned(),
            cache_size_mb: 64,
            busy_timeout_secs: 5,
        }
    }
}

/// Indexing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory names to prune during walks, in addition to the built-in set.
    pub extra_ignored_dirs: Vec<String>,
}

/// Graph taxonomy configuration: extra kinds registered on top of the
/// built-ins, so a deployment can add a node or edge kind without a code
/// change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub node_kinds: Vec<KindDef>,
    pub edge_kinds: Vec<KindDef>,
}

/// A configured kind registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KindDef {
    pub name: String,
    pub label: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrips_through_toml() {
        let config = CartoConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).expect("default config should serialize to TOML");
        let parsed: CartoConfig =
            toml::from_str(&toml_str).expect("serialized TOML should parse back");
        assert_eq!(parsed.storage.cache_size_mb, 64);
        assert!(parsed.index.extra_ignored_dirs.is_empty());
    }

    #[test]
    fn load_nonexistent_returns_error() {
        let result = CartoConfig::load(Path::new("/tmp/nonexistent_carto_config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join("carto_config_test");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("config.toml");

        let mut config = CartoConfig::default();
        config.storage.cache_size_mb = 128;
        config.index.extra_ignored_dirs.push("vendor".to_string());

        config.save(&path).expect("save should succeed");
        let loaded = CartoConfig::load(&path).expect("load should succeed");

        assert_eq!(loaded.storage.cache_size_mb, 128);
        assert_eq!(loaded.index.extra_ignored_dirs, vec!["vendor".to_string()]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn default_path_ends_with_config_toml() {
        let path = CartoConfig::default_path();
        assert!(path.ends_with("config.toml"));
    }

    #[test]
    fn partial_toml_uses_defaults_for_missing_fields() {
        let partial = r#"
[storage]
cache_size_mb = 32
"#;
        let config: CartoConfig = toml::from_str(partial).expect("partial TOML should parse");
        assert_eq!(config.storage.cache_size_mb, 32);
        assert_eq!(config.storage.busy_timeout_secs, 5);
    }

    #[test]
    fn configured_kinds_register() {
        let toml_str = r#"
[[graph.node_kinds]]
name = "endpoint"
label = "Endpoint"
description = "A REST route definition"

[[graph.edge_kinds]]
name = "handles"
label = "Handles"
description = "Endpoint handled by a function"
"#;
        let config: CartoConfig = toml::from_str(toml_str).unwrap();
        let registry = config.kind_registry().unwrap();
        registry.validate_node_kind("endpoint").unwrap();
        registry.validate_edge_kind("handles").unwrap();
        // Built-ins survive
        registry.validate_node_kind("function").unwrap();
    }

    #[test]
    fn invalid_configured_kind_is_rejected() {
        let toml_str = r#"
[[graph.node_kinds]]
name = "Bad.Name"
label = "Bad"
description = "nope"
"#;
        let config: CartoConfig = toml::from_str(toml_str).unwrap();
        assert!(config.kind_registry().is_err());
    }
}
