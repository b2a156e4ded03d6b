// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Extensions document
//!
//! Lists which catalog plugins a deployment uses, one section per kind:
//!
//! ```yaml
//! operators:
//!   - pipewright.operators.Const
//! datasources:
//!   - pipewright.sources.Inline
//! schedulers:
//!   - pipewright.schedulers.Interval
//! triggers:
//!   - pipewright.triggers.LocalFile
//! ```
//!
//! YAML is the default format; files ending in `.toml` are read as TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::errors::{PipewrightError, PipewrightResult};
use crate::registry::{Catalog, PluginKind, Registry};

/// Parsed extensions document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionsDocument {
    #[serde(default)]
    pub operators: Vec<String>,

    #[serde(default)]
    pub datasources: Vec<String>,

    #[serde(default)]
    pub schedulers: Vec<String>,

    #[serde(default)]
    pub triggers: Vec<String>,
}

impl ExtensionsDocument {
    /// Load from a YAML or TOML file
    pub fn from_file(path: &Path) -> PipewrightResult<Self> {
        if !path.is_file() {
            return Err(PipewrightError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Self::from_toml(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Parse from a YAML string; an empty document lists nothing
    pub fn from_yaml(yaml: &str) -> PipewrightResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(value).map_err(Into::into)
    }

    /// Parse from a TOML string
    pub fn from_toml(content: &str) -> PipewrightResult<Self> {
        toml::from_str(content).map_err(Into::into)
    }

    /// Dotted paths listed for `kind`
    pub fn section(&self, kind: PluginKind) -> &[String] {
        match kind {
            PluginKind::Operator => &self.operators,
            PluginKind::DataSource => &self.datasources,
            PluginKind::Scheduler => &self.schedulers,
            PluginKind::Trigger => &self.triggers,
        }
    }

    /// Resolve every listed path against `catalog` into `registry`.
    ///
    /// The first unresolvable path aborts the load.
    pub fn install(&self, catalog: &Catalog, registry: &mut Registry) -> PipewrightResult<()> {
        for kind in PluginKind::ALL {
            for path in self.section(kind) {
                let name = catalog.install(kind, path, registry)?;
                info!(kind = %kind, name = %name, path = %path, "registered extension");
            }
        }
        Ok(())
    }
}

/// Build a registry from the extensions document at `path`
pub fn load_extensions(path: &Path, catalog: &Catalog) -> PipewrightResult<Registry> {
    let document = ExtensionsDocument::from_file(path)?;
    let mut registry = Registry::new();
    document.install(catalog, &mut registry)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_extensions_success() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
operators:
  - pipewright.operators.Const
  - pipewright.operators.Sum
schedulers:
  - pipewright.schedulers.Interval
triggers:
  - pipewright.triggers.LocalFile
"#,
        )
        .unwrap();

        let registry = load_extensions(&path, &Catalog::builtin()).unwrap();

        assert_eq!(registry.names(PluginKind::Operator), vec!["Const", "Sum"]);
        assert!(registry.contains(PluginKind::Scheduler, "Interval"));
        assert!(registry.contains(PluginKind::Trigger, "LocalFile"));
        assert!(registry.names(PluginKind::DataSource).is_empty());
    }

    #[test]
    fn test_load_extensions_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "datasources = [\"pipewright.sources.Inline\"]\n").unwrap();

        let registry = load_extensions(&path, &Catalog::builtin()).unwrap();
        assert_eq!(registry.names(PluginKind::DataSource), vec!["Inline"]);
    }

    #[test]
    fn test_unknown_extension_is_fatal() {
        let doc = ExtensionsDocument::from_yaml("operators: [dummy_module.DummyOperator]").unwrap();
        let mut registry = Registry::new();

        let err = doc.install(&Catalog::builtin(), &mut registry).unwrap_err();
        assert!(err.to_string().contains("dummy_module.DummyOperator"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_extensions(Path::new("does/not/exist.yaml"), &Catalog::builtin()).unwrap_err();
        assert!(matches!(err, PipewrightError::FileNotFound { .. }));
    }

    #[test]
    fn test_empty_document() {
        let doc = ExtensionsDocument::from_yaml("").unwrap();
        assert_eq!(doc, ExtensionsDocument::default());
    }
}
