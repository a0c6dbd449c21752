//! Open kind taxonomy for graph nodes and edges.
//!
//! Node and edge kinds are validated open string sets rather than closed
//! enums: a new kind can be registered at runtime (programmatically or from
//! the `[graph]` config section) without code changes. The merge boundary
//! rejects kinds that were never registered.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::CartoError;

/// Display metadata for a registered kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindInfo {
    /// Human-readable label, e.g. "Function".
    pub label: String,
    pub description: String,
}

/// Built-in node kinds registered by [`KindRegistry::with_defaults`].
pub const DEFAULT_NODE_KINDS: &[(&str, &str, &str)] = &[
    ("file", "File", "A source file"),
    ("function", "Function", "A function or arrow-function declaration"),
    ("class", "Class", "A class or struct declaration"),
    ("interface", "Interface", "An interface declaration"),
    ("type", "Type", "A type alias declaration"),
    ("constant", "Constant", "A top-level constant"),
    ("module", "Module", "An import target; may be external"),
];

/// Built-in edge kinds registered by [`KindRegistry::with_defaults`].
pub const DEFAULT_EDGE_KINDS: &[(&str, &str, &str)] = &[
    ("imports", "Imports", "File imports a module"),
    ("calls", "Calls", "Declaration calls another declaration"),
    ("extends", "Extends", "Class or interface inheritance"),
    ("implements", "Implements", "Class implements an interface"),
    ("defines", "Defines", "File defines a declaration"),
];

/// Validated open sets of node and edge kinds.
#[derive(Debug, Clone)]
pub struct KindRegistry {
    node_kinds: HashMap<String, KindInfo>,
    edge_kinds: HashMap<String, KindInfo>,
}

impl KindRegistry {
    /// An empty registry with no kinds at all.
    pub fn empty() -> Self {
        Self {
            node_kinds: HashMap::new(),
            edge_kinds: HashMap::new(),
        }
    }

    /// A registry pre-populated with the built-in kinds.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for (name, label, description) in DEFAULT_NODE_KINDS {
            registry
                .register_node_kind(name, label, description)
                .expect("built-in node kind names are valid");
        }
        for (name, label, description) in DEFAULT_EDGE_KINDS {
            registry
                .register_edge_kind(name, label, description)
                .expect("built-in edge kind names are valid");
        }
        registry
    }

    /// Register a node kind. Re-registering an existing name replaces its
    /// metadata.
    pub fn register_node_kind(
        &mut self,
        name: &str,
        label: &str,
        description: &str,
    ) -> Result<(), CartoError> {
        validate_kind_name(name)?;
        self.node_kinds.insert(
            name.to_string(),
            KindInfo {
                label: label.to_string(),
                description: description.to_string(),
            },
        );
        Ok(())
    }

    /// Register an edge kind.
    pub fn register_edge_kind(
        &mut self,
        name: &str,
        label: &str,
        description: &str,
    ) -> Result<(), CartoError> {
        validate_kind_name(name)?;
        self.edge_kinds.insert(
            name.to_string(),
            KindInfo {
                label: label.to_string(),
                description: description.to_string(),
            },
        );
        Ok(())
    }

    /// Reject a node kind that was never registered.
    pub fn validate_node_kind(&self, name: &str) -> Result<(), CartoError> {
        if self.node_kinds.contains_key(name) {
            Ok(())
        } else {
            Err(CartoError::UnknownKind {
                taxonomy: "node",
                name: name.to_string(),
            })
        }
    }

    /// Reject an edge kind that was never registered.
    pub fn validate_edge_kind(&self, name: &str) -> Result<(), CartoError> {
        if self.edge_kinds.contains_key(name) {
            Ok(())
        } else {
            Err(CartoError::UnknownKind {
                taxonomy: "edge",
                name: name.to_string(),
            })
        }
    }

    /// Metadata for a node kind, if registered.
    pub fn node_kind_info(&self, name: &str) -> Option<&KindInfo> {
        self.node_kinds.get(name)
    }

    /// Metadata for an edge kind, if registered.
    pub fn edge_kind_info(&self, name: &str) -> Option<&KindInfo> {
        self.edge_kinds.get(name)
    }

    /// Sorted list of registered node kind names.
    pub fn node_kinds(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.node_kinds.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Sorted list of registered edge kind names.
    pub fn edge_kinds(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.edge_kinds.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Kind names must be lowercase identifiers so they can never contain the
/// `.` and `:` delimiters of the `{kind}.{path}[:{name}]` id format.
fn validate_kind_name(name: &str) -> Result<(), CartoError> {
    let valid = !name.is_empty()
        && name.chars().next().is_some_and(|c| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CartoError::InvalidKindName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_registered() {
        let registry = KindRegistry::with_defaults();
        for kind in ["file", "function", "class", "interface", "type", "constant", "module"] {
            registry.validate_node_kind(kind).unwrap();
        }
        for kind in ["imports", "calls", "extends", "implements", "defines"] {
            registry.validate_edge_kind(kind).unwrap();
        }
    }

    #[test]
    fn unregistered_kind_is_rejected() {
        let registry = KindRegistry::with_defaults();
        let err = registry.validate_node_kind("widget").unwrap_err();
        assert!(err.to_string().contains("widget"));
        assert!(registry.validate_edge_kind("summons").is_err());
    }

    #[test]
    fn registration_without_code_changes() {
        let mut registry = KindRegistry::with_defaults();
        registry
            .register_node_kind("endpoint", "Endpoint", "A REST route definition")
            .unwrap();
        registry.validate_node_kind("endpoint").unwrap();
        assert_eq!(
            registry.node_kind_info("endpoint").unwrap().label,
            "Endpoint"
        );
    }

    #[test]
    fn kind_names_must_be_identifiers() {
        let mut registry = KindRegistry::empty();
        assert!(registry.register_node_kind("", "x", "x").is_err());
        assert!(registry.register_node_kind("Weird", "x", "x").is_err());
        assert!(registry.register_node_kind("a.b", "x", "x").is_err());
        assert!(registry.register_node_kind("a:b", "x", "x").is_err());
        assert!(registry.register_node_kind("route_v2", "x", "x").is_ok());
    }

    #[test]
    fn kind_lists_are_sorted() {
        let registry = KindRegistry::with_defaults();
        let kinds = registry.node_kinds();
        let mut sorted = kinds.clone();
        sorted.sort_unstable();
        assert_eq!(kinds, sorted);
        assert!(kinds.contains(&"file"));
    }
}
