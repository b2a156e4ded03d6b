// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Pipeline document structures
//!
//! Defines the schema for pipeline YAML files.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::errors::{PipewrightError, PipewrightResult};
use crate::plugins::Params;

/// Pipeline document
///
/// `event` and `scheduler` pick the execution mode; with neither present the
/// pipeline runs once, immediately.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineDocument {
    /// Event source that triggers this pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<EventSpec>,

    /// Timer that triggers this pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<SchedulerSpec>,

    /// Steps in declaration order
    #[serde(default, rename = "pipeline", skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<StepSpec>>,

    /// Where the document was read from, for error messages
    #[serde(skip)]
    origin: String,
}

impl PipelineDocument {
    /// Build an in-memory document from steps
    pub fn from_steps(steps: Vec<StepSpec>) -> Self {
        Self {
            steps: Some(steps),
            origin: "<inline>".to_string(),
            ..Default::default()
        }
    }

    /// Load a document from a YAML file
    pub fn from_file(path: &Path) -> PipewrightResult<Self> {
        if !path.is_file() {
            return Err(PipewrightError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse a document from a YAML string
    pub fn from_yaml(yaml: &str) -> PipewrightResult<Self> {
        Self::parse(yaml, "<inline>")
    }

    fn parse(yaml: &str, origin: &str) -> PipewrightResult<Self> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(yaml).map_err(|e| PipewrightError::malformed(origin, e))?;

        if !value.is_mapping() {
            return Err(PipewrightError::malformed(
                origin,
                "top level is not a mapping",
            ));
        }

        let mut document: Self =
            serde_yaml::from_value(value).map_err(|e| PipewrightError::malformed(origin, e))?;
        document.origin = origin.to_string();
        Ok(document)
    }

    /// Serialize document to YAML
    pub fn to_yaml(&self) -> PipewrightResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Where the document came from (a path or `<inline>`)
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The declared steps; a document without a `pipeline` key cannot run
    pub fn steps(&self) -> PipewrightResult<&[StepSpec]> {
        self.steps
            .as_deref()
            .ok_or_else(|| self.missing_pipeline())
    }

    /// Take the declared steps out of the document
    pub fn into_steps(self) -> PipewrightResult<Vec<StepSpec>> {
        match self.steps {
            Some(steps) => Ok(steps),
            None => Err(self.missing_pipeline()),
        }
    }

    /// Whether the pipeline runs only when something external fires it
    pub fn is_deferred(&self) -> bool {
        self.event.is_some() || self.scheduler.is_some()
    }

    fn missing_pipeline(&self) -> PipewrightError {
        PipewrightError::malformed(&self.origin, "does not contain 'pipeline' section")
    }
}

/// Plugin referenced by a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind<'a> {
    Operator(&'a str),
    DataSource(&'a str),
}

/// A single pipeline step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    /// Step id (expected unique within the document)
    pub id: String,

    /// Operator name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,

    /// Data source name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasource: Option<String>,

    /// Steps whose results feed this one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<DependsOn>,

    /// Static constructor params
    #[serde(default)]
    pub params: Params,
}

impl StepSpec {
    /// New operator step
    pub fn new_operator(id: impl Into<String>, operator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            operator: Some(operator.into()),
            datasource: None,
            depends_on: None,
            params: Params::new(),
        }
    }

    /// New data source step
    pub fn new_datasource(id: impl Into<String>, datasource: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            operator: None,
            datasource: Some(datasource.into()),
            depends_on: None,
            params: Params::new(),
        }
    }

    /// Set a static param
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Depend on a single step
    pub fn after(mut self, dependency: impl Into<String>) -> Self {
        self.depends_on = Some(DependsOn::Single(dependency.into()));
        self
    }

    /// Depend on several steps, in order
    pub fn after_all<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = Some(DependsOn::Many(
            dependencies.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// The plugin this step references; exactly one must be set
    pub fn kind(&self) -> PipewrightResult<StepKind<'_>> {
        match (&self.operator, &self.datasource) {
            (Some(op), None) => Ok(StepKind::Operator(op)),
            (None, Some(ds)) => Ok(StepKind::DataSource(ds)),
            (None, None) => Err(PipewrightError::MissingPluginReference {
                step: self.id.clone(),
            }),
            (Some(_), Some(_)) => Err(PipewrightError::AmbiguousPluginReference {
                step: self.id.clone(),
            }),
        }
    }

    /// Declared dependencies; an empty list counts as none
    pub fn dependencies(&self) -> Option<&DependsOn> {
        self.depends_on.as_ref().filter(|deps| !deps.is_empty())
    }
}

/// `depends_on` value: one id or an ordered list of ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependsOn {
    Single(String),
    Many(Vec<String>),
}

impl DependsOn {
    /// Dependency ids in declaration order
    pub fn ids(&self) -> Vec<&str> {
        match self {
            Self::Single(id) => vec![id.as_str()],
            Self::Many(ids) => ids.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Many(ids) if ids.is_empty())
    }
}

/// `event` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSpec {
    /// Trigger name in the registry
    #[serde(rename = "type")]
    pub kind: String,

    /// Trigger configuration
    #[serde(default)]
    pub config: Params,
}

/// `scheduler` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSpec {
    /// Scheduler name in the registry
    #[serde(rename = "type")]
    pub kind: String,

    /// Scheduler configuration
    #[serde(default)]
    pub config: Params,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_simple_pipeline() {
        let yaml = r#"
pipeline:
  - id: a
    operator: Const
    params:
      value: 2
  - id: b
    datasource: Inline
  - id: final
    operator: Sum
    depends_on: [a, b]
"#;

        let doc = PipelineDocument::from_yaml(yaml).unwrap();
        let steps = doc.steps().unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].kind().unwrap(), StepKind::Operator("Const"));
        assert_eq!(steps[0].params["value"], json!(2));
        assert_eq!(steps[1].kind().unwrap(), StepKind::DataSource("Inline"));
        assert_eq!(
            steps[2].dependencies().unwrap().ids(),
            vec!["a", "b"]
        );
        assert!(!doc.is_deferred());
    }

    #[test]
    fn test_parse_single_dependency() {
        let yaml = r#"
pipeline:
  - id: first
    operator: Const
  - id: second
    operator: Show
    depends_on: first
"#;

        let doc = PipelineDocument::from_yaml(yaml).unwrap();
        let steps = doc.steps().unwrap();
        assert_eq!(
            steps[1].depends_on,
            Some(DependsOn::Single("first".into()))
        );
    }

    #[test]
    fn test_parse_event_and_scheduler() {
        let yaml = r#"
event:
  type: LocalFile
  config:
    path: ./data
scheduler:
  type: Interval
"#;

        let doc = PipelineDocument::from_yaml(yaml).unwrap();
        let event = doc.event.as_ref().unwrap();
        assert_eq!(event.kind, "LocalFile");
        assert_eq!(event.config["path"], json!("./data"));

        let scheduler = doc.scheduler.as_ref().unwrap();
        assert_eq!(scheduler.kind, "Interval");
        assert!(scheduler.config.is_empty());
        assert!(doc.is_deferred());
    }

    #[test]
    fn test_missing_pipeline_section() {
        let doc = PipelineDocument::from_yaml("not_pipeline: []").unwrap();
        let err = doc.steps().unwrap_err();
        assert!(matches!(err, PipewrightError::MalformedDocument { .. }));
        assert!(err.to_string().contains("does not contain 'pipeline' section"));
    }

    #[test]
    fn test_non_mapping_is_malformed() {
        for yaml in ["- a\n- b\n", "42", ""] {
            let err = PipelineDocument::from_yaml(yaml).unwrap_err();
            assert!(
                matches!(err, PipewrightError::MalformedDocument { .. }),
                "expected malformed for {yaml:?}"
            );
        }
    }

    #[test]
    fn test_step_kind_validation() {
        let step = StepSpec {
            id: "step1".into(),
            operator: None,
            datasource: None,
            depends_on: None,
            params: Params::new(),
        };
        assert!(matches!(
            step.kind(),
            Err(PipewrightError::MissingPluginReference { step }) if step == "step1"
        ));

        let mut both = StepSpec::new_operator("x", "Const");
        both.datasource = Some("Inline".into());
        assert!(matches!(
            both.kind(),
            Err(PipewrightError::AmbiguousPluginReference { .. })
        ));
    }

    #[test]
    fn test_empty_dependency_list_counts_as_none() {
        let step = StepSpec::new_operator("x", "Const").after_all(Vec::<String>::new());
        assert!(step.depends_on.is_some());
        assert!(step.dependencies().is_none());
    }

    #[test]
    fn test_builders_round_trip_yaml() {
        let doc = PipelineDocument::from_steps(vec![
            StepSpec::new_operator("a", "Const").with_param("value", json!(2)),
            StepSpec::new_operator("b", "Show").after("a"),
        ]);

        let parsed = PipelineDocument::from_yaml(&doc.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed.steps().unwrap(), doc.steps().unwrap());
    }
}
