// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Pipeline runner
//!
//! Executes the steps of one document in declaration order. There is no
//! topological sort: a dependency must already have a result when its
//! dependent is reached, otherwise the run fails with
//! [`PipewrightError::UnresolvedDependency`].

use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{PipewrightError, PipewrightResult};
use crate::pipeline::{DependsOn, ParamOverrides, PipelineDocument, StepKind, StepSpec};
use crate::plugins::StepInput;
use crate::registry::Registry;

/// Step id → value produced by that step, for one run
pub type RunResults = HashMap<String, Value>;

/// Runs one pipeline document against a registry
pub struct PipelineRunner {
    registry: Arc<Registry>,
    steps: Arc<Vec<StepSpec>>,
    overrides: ParamOverrides,
    results: RunResults,
}

impl PipelineRunner {
    /// Create a runner over `steps`
    pub fn new(registry: Arc<Registry>, steps: Vec<StepSpec>) -> Self {
        Self {
            registry,
            steps: Arc::new(steps),
            overrides: ParamOverrides::default(),
            results: RunResults::new(),
        }
    }

    /// Create a runner from a parsed document; the document must declare steps
    pub fn from_document(
        registry: Arc<Registry>,
        document: PipelineDocument,
    ) -> PipewrightResult<Self> {
        Ok(Self::new(registry, document.into_steps()?))
    }

    /// Read and parse the document at `path`
    pub fn from_file(registry: Arc<Registry>, path: &Path) -> PipewrightResult<Self> {
        Self::from_document(registry, PipelineDocument::from_file(path)?)
    }

    /// Layer parameter overrides on top of any already set
    pub fn override_params(mut self, overrides: ParamOverrides) -> Self {
        self.overrides.merge(overrides);
        self
    }

    /// Start from previously produced results (for incremental execution)
    pub fn with_results(mut self, results: RunResults) -> Self {
        self.results = results;
        self
    }

    /// Declared steps
    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    /// Results accumulated so far, including those of a failed run
    pub fn results(&self) -> &RunResults {
        &self.results
    }

    pub fn into_results(self) -> RunResults {
        self.results
    }

    /// Run every step with no initial input
    pub async fn run(&mut self) -> PipewrightResult<RunResults> {
        self.run_with_input(StepInput::Absent).await
    }

    /// Run every step; steps without dependencies receive `initial`.
    ///
    /// Previous results are discarded first. On failure the results produced
    /// before the failing step stay available through [`results`](Self::results).
    pub async fn run_with_input(&mut self, initial: StepInput) -> PipewrightResult<RunResults> {
        self.results.clear();
        let start = Instant::now();
        let steps = Arc::clone(&self.steps);

        for step in steps.iter() {
            self.run_step(step, &initial).await?;
        }

        debug!(
            steps = steps.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "pipeline run finished"
        );

        Ok(self.results.clone())
    }

    /// Execute one step against the current partial results and store its
    /// value, replacing any previous value for the same id
    pub async fn run_step(
        &mut self,
        step: &StepSpec,
        initial: &StepInput,
    ) -> PipewrightResult<&Value> {
        let kind = step.kind()?;

        if matches!(kind, StepKind::DataSource(_)) && step.dependencies().is_some() {
            return Err(PipewrightError::InvalidDataSourceDependency {
                step: step.id.clone(),
            });
        }

        let params = self.overrides.apply(&step.id, &step.params);

        info!(step = %step.id, "executing step");

        let outcome = match kind {
            StepKind::Operator(name) => {
                let input = self.resolve_input(step, initial)?;
                let factory = self.registry.operator(name)?;
                let operator = factory(&params)?;
                operator.run(input).await
            }
            StepKind::DataSource(name) => {
                let factory = self.registry.datasource(name)?;
                let source = factory(&params)?;
                source.fetch().await
            }
        };

        let value = outcome.map_err(|e| {
            warn!(step = %step.id, error = %e, "step failed");
            PipewrightError::Plugin(e)
        })?;

        self.results.insert(step.id.clone(), value);
        Ok(&self.results[&step.id])
    }

    fn resolve_input(&self, step: &StepSpec, initial: &StepInput) -> PipewrightResult<StepInput> {
        match step.dependencies() {
            None => Ok(initial.clone()),
            Some(DependsOn::Single(id)) => self.lookup(step, id).map(StepInput::Single),
            Some(DependsOn::Many(ids)) => ids
                .iter()
                .map(|id| self.lookup(step, id))
                .collect::<PipewrightResult<Vec<_>>>()
                .map(StepInput::Many),
        }
    }

    fn lookup(&self, step: &StepSpec, dependency: &str) -> PipewrightResult<Value> {
        self.results
            .get(dependency)
            .cloned()
            .ok_or_else(|| PipewrightError::UnresolvedDependency {
                step: step.id.clone(),
                dependency: dependency.to_string(),
            })
    }
}

/// Load the document at `path` fresh and run it once
pub async fn run_file(
    registry: Arc<Registry>,
    path: &Path,
    initial: StepInput,
    overrides: ParamOverrides,
) -> PipewrightResult<RunResults> {
    PipelineRunner::from_file(registry, path)?
        .override_params(overrides)
        .run_with_input(initial)
        .await
}
