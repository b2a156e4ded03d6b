// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Pipeline validation
//!
//! Static checks over a pipeline document, run without executing any plugin.
//! The runner never reorders steps, so a dependency declared after its
//! dependent is reported here as an error even though the graph itself may be
//! a perfectly valid DAG.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

use crate::errors::PipewrightError;
use crate::pipeline::{PipelineDocument, StepKind, StepSpec};
use crate::registry::{PluginKind, Registry};

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a pipeline document.
    ///
    /// With a registry, plugin names are also checked for registration.
    pub fn validate(document: &PipelineDocument, registry: Option<&Registry>) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Some(registry) = registry {
            Self::validate_backends(document, registry, &mut result);
        }

        let steps = match document.steps() {
            Ok(steps) => steps,
            Err(e) => {
                if document.is_deferred() {
                    result.add_warning(&format!("{e}; runs fired for it will fail"));
                } else {
                    result.add_error(&e.to_string());
                }
                return result;
            }
        };

        if steps.is_empty() {
            result.add_warning("Pipeline has no steps defined");
            return result;
        }

        let mut seen = HashSet::new();
        for step in steps {
            if !seen.insert(step.id.as_str()) {
                result.add_error(&format!(
                    "Duplicate step id '{}'; later results overwrite earlier ones",
                    step.id
                ));
            }
        }

        for step in steps {
            Self::validate_step(step, registry, &mut result);
        }

        Self::validate_order(steps, &mut result);

        result
    }

    fn validate_backends(document: &PipelineDocument, registry: &Registry, result: &mut ValidationResult) {
        if let Some(scheduler) = &document.scheduler {
            if !registry.contains(PluginKind::Scheduler, &scheduler.kind) {
                result.add_error(
                    &PipewrightError::SchedulerNotRegistered {
                        name: scheduler.kind.clone(),
                    }
                    .to_string(),
                );
            }
        }

        if let Some(event) = &document.event {
            if !registry.contains(PluginKind::Trigger, &event.kind) {
                result.add_error(
                    &PipewrightError::TriggerNotRegistered {
                        name: event.kind.clone(),
                    }
                    .to_string(),
                );
            }
        }
    }

    /// Validate a single step
    fn validate_step(step: &StepSpec, registry: Option<&Registry>, result: &mut ValidationResult) {
        let kind = match step.kind() {
            Ok(kind) => kind,
            Err(e) => {
                result.add_error(&e.to_string());
                return;
            }
        };

        let (plugin_kind, name) = match kind {
            StepKind::Operator(name) => (PluginKind::Operator, name),
            StepKind::DataSource(name) => {
                if step.dependencies().is_some() {
                    result.add_error(
                        &PipewrightError::InvalidDataSourceDependency {
                            step: step.id.clone(),
                        }
                        .to_string(),
                    );
                }
                (PluginKind::DataSource, name)
            }
        };

        if let Some(registry) = registry {
            if !registry.contains(plugin_kind, name) {
                result.add_error(&format!(
                    "Step '{}': {}",
                    step.id,
                    PipewrightError::NotFound {
                        kind: plugin_kind,
                        name: name.to_string(),
                    }
                ));
            }
        }
    }

    /// Check dependency ids, cycles and declaration order
    fn validate_order(steps: &[StepSpec], result: &mut ValidationResult) {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
        let mut position: HashMap<&str, usize> = HashMap::new();

        for (idx, step) in steps.iter().enumerate() {
            nodes
                .entry(step.id.as_str())
                .or_insert_with(|| graph.add_node(step.id.as_str()));
            position.entry(step.id.as_str()).or_insert(idx);
        }

        let mut out_of_order = false;

        for (idx, step) in steps.iter().enumerate() {
            let Some(deps) = step.dependencies() else {
                continue;
            };

            for dep in deps.ids() {
                let Some(&dep_node) = nodes.get(dep) else {
                    result.add_error(&format!(
                        "Step '{}' depends on unknown step '{}'",
                        step.id, dep
                    ));
                    continue;
                };

                graph.update_edge(dep_node, nodes[step.id.as_str()], ());

                if position[dep] >= idx {
                    out_of_order = true;
                    result.add_error(&format!(
                        "Step '{}' depends on '{}' which is declared after it",
                        step.id, dep
                    ));
                }
            }
        }

        match toposort(&graph, None) {
            Ok(order) if out_of_order => {
                let names: Vec<&str> = order.into_iter().map(|n| graph[n]).collect();
                result.add_warning(&format!(
                    "Steps run in declaration order; a working order is: {}",
                    names.join(", ")
                ));
            }
            Ok(_) => {}
            Err(cycle) => {
                result.add_error(&format!(
                    "Circular dependency involving step '{}'",
                    graph[cycle.node_id()]
                ));
            }
        }
    }
}

/// Result of pipeline validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Catalog, ExtensionsDocument};
    use serde_json::json;

    fn document(steps: Vec<StepSpec>) -> PipelineDocument {
        PipelineDocument::from_steps(steps)
    }

    #[test]
    fn test_valid_pipeline() {
        let doc = document(vec![
            StepSpec::new_operator("a", "Const").with_param("value", json!(2)),
            StepSpec::new_operator("b", "Const").with_param("value", json!(3)),
            StepSpec::new_operator("final", "Sum").after_all(["a", "b"]),
        ]);

        let result = PipelineValidator::validate(&doc, None);
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_forward_reference_suggests_order() {
        let doc = document(vec![
            StepSpec::new_operator("final", "Sum").after("a"),
            StepSpec::new_operator("a", "Const"),
        ]);

        let result = PipelineValidator::validate(&doc, None);
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("declared after"));
        assert!(result.warnings.iter().any(|w| w.contains("a, final")));
    }

    #[test]
    fn test_cycle_and_unknown_dependency() {
        let doc = document(vec![
            StepSpec::new_operator("x", "Show").after("y"),
            StepSpec::new_operator("y", "Show").after("x"),
            StepSpec::new_operator("z", "Show").after("ghost"),
        ]);

        let result = PipelineValidator::validate(&doc, None);
        assert!(result.errors.iter().any(|e| e.contains("Circular")));
        assert!(result.errors.iter().any(|e| e.contains("unknown step 'ghost'")));
    }

    #[test]
    fn test_duplicate_and_structural_errors() {
        let mut bare = StepSpec::new_operator("bare", "Show");
        bare.operator = None;

        let doc = document(vec![
            StepSpec::new_operator("dup", "Show"),
            StepSpec::new_operator("dup", "Show"),
            StepSpec::new_datasource("src", "Inline").after("dup"),
            bare,
        ]);

        let result = PipelineValidator::validate(&doc, None);
        assert!(result.errors.iter().any(|e| e.contains("Duplicate step id 'dup'")));
        assert!(result.errors.iter().any(|e| e.contains("Datasource step 'src'")));
        assert!(result.errors.iter().any(|e| e.contains("Step 'bare' must have")));
    }

    #[test]
    fn test_registry_checks() {
        let extensions = ExtensionsDocument::from_yaml("operators: [pipewright.operators.Const]").unwrap();
        let mut registry = Registry::new();
        extensions.install(&Catalog::builtin(), &mut registry).unwrap();

        let doc = PipelineDocument::from_yaml(
            r#"
scheduler:
  type: Cron
pipeline:
  - id: a
    operator: Const
  - id: b
    operator: Missing
"#,
        )
        .unwrap();

        let result = PipelineValidator::validate(&doc, Some(&registry));
        assert_eq!(result.errors.len(), 2, "{:?}", result.errors);
        assert!(result.errors.iter().any(|e| e.contains("Scheduler 'Cron' not registered")));
        assert!(result.errors.iter().any(|e| e.contains("Operator 'Missing'")));
    }

    #[test]
    fn test_missing_pipeline_section() {
        let doc = PipelineDocument::from_yaml("scheduler: {type: Interval}").unwrap();
        let result = PipelineValidator::validate(&doc, None);
        assert!(result.is_valid());
        assert!(result.has_warnings());

        let doc = PipelineDocument::from_yaml("other: 1").unwrap();
        let result = PipelineValidator::validate(&doc, None);
        assert!(!result.is_valid());
    }
}
