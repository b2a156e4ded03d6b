// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Error types
//!
//! Every structural failure names the offending identifier (step id,
//! dependency id, plugin kind and name) so a failed run can be diagnosed from
//! the message alone. Failures raised by plugin code pass through untouched.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::registry::PluginKind;

/// Result type for pipewright operations
pub type PipewrightResult<T> = Result<T, PipewrightError>;

/// Main error type for pipewright
#[derive(Error, Debug, Diagnostic)]
pub enum PipewrightError {
    // ─────────────────────────────────────────────────────────────────────────
    // Step Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Step '{step}' must have either 'operator' or 'datasource'")]
    #[diagnostic(
        code(pipewright::missing_plugin_reference),
        help("Add an 'operator: <name>' or 'datasource: <name>' entry to step '{step}'")
    )]
    MissingPluginReference { step: String },

    #[error("Step '{step}' declares both 'operator' and 'datasource'")]
    #[diagnostic(
        code(pipewright::ambiguous_plugin_reference),
        help("Keep exactly one of 'operator' or 'datasource' on step '{step}'")
    )]
    AmbiguousPluginReference { step: String },

    #[error("Datasource step '{step}' cannot depend on another step")]
    #[diagnostic(
        code(pipewright::invalid_datasource_dependency),
        help("Datasources are entry points; remove 'depends_on' or turn '{step}' into an operator")
    )]
    InvalidDataSourceDependency { step: String },

    #[error("Step '{step}' depends on '{dependency}' which has not produced a result")]
    #[diagnostic(
        code(pipewright::unresolved_dependency),
        help("Declare '{dependency}' before '{step}' in the pipeline")
    )]
    UnresolvedDependency { step: String, dependency: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Registry Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("{kind} '{name}' not found in registry")]
    #[diagnostic(
        code(pipewright::not_found),
        help("Check that '{name}' is listed in the extensions document")
    )]
    NotFound { kind: PluginKind, name: String },

    #[error("Scheduler '{name}' not registered")]
    #[diagnostic(code(pipewright::scheduler_not_registered))]
    SchedulerNotRegistered { name: String },

    #[error("Event trigger '{name}' not registered")]
    #[diagnostic(code(pipewright::trigger_not_registered))]
    TriggerNotRegistered { name: String },

    #[error("Cannot resolve {kind} extension '{path}'")]
    #[diagnostic(
        code(pipewright::extension_not_found),
        help("Run 'pipewright plugins' to see which extensions are available")
    )]
    ExtensionNotFound { kind: PluginKind, path: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Document Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Malformed document '{document}': {reason}")]
    #[diagnostic(code(pipewright::malformed_document))]
    MalformedDocument { document: String, reason: String },

    #[error("File not found: {path}")]
    #[diagnostic(code(pipewright::file_not_found))]
    FileNotFound { path: PathBuf },

    // ─────────────────────────────────────────────────────────────────────────
    // Plugin Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(pipewright::plugin_failed))]
    Plugin(#[from] anyhow::Error),

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(pipewright::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(pipewright::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(pipewright::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(pipewright::toml_error))]
    Toml { message: String },
}

impl From<std::io::Error> for PipewrightError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for PipewrightError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for PipewrightError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for PipewrightError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl PipewrightError {
    /// Create a malformed document error
    pub fn malformed(document: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedDocument {
            document: document.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error came from plugin code rather than the core
    pub fn is_plugin_failure(&self) -> bool {
        matches!(self, Self::Plugin(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = PipewrightError::UnresolvedDependency {
            step: "final".into(),
            dependency: "a".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'final'"));
        assert!(msg.contains("'a'"));

        let err = PipewrightError::NotFound {
            kind: PluginKind::Operator,
            name: "Nope".into(),
        };
        assert_eq!(err.to_string(), "Operator 'Nope' not found in registry");
    }

    #[test]
    fn test_plugin_error_is_transparent() {
        let err = PipewrightError::from(anyhow::anyhow!("disk full"));
        assert!(err.is_plugin_failure());
        assert_eq!(err.to_string(), "disk full");
    }
}
