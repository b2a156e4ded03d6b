// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Plugin catalog
//!
//! The set of plugins an extensions document may refer to, keyed by their
//! fully qualified dotted path (`pipewright.operators.Const`). Loading an
//! extensions document copies the listed entries into a [`Registry`] under
//! their bare name.

use std::collections::BTreeMap;

use crate::errors::{PipewrightError, PipewrightResult};
use crate::plugins::{
    ConstOperator, InlineSource, IntervalScheduler, JsonFileSource, LocalFileTrigger,
    SaveJsonOperator, ShowOperator, SumOperator,
};
use crate::registry::{PluginFactory, PluginKind, Registry};

/// Dotted path → factory table of every plugin this binary knows about
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    entries: BTreeMap<String, PluginFactory>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the built-in plugins
    pub fn builtin() -> Self {
        Self::new()
            .with(
                "pipewright.operators.Const",
                PluginFactory::operator(|params| Ok(Box::new(ConstOperator::from_params(params)?))),
            )
            .with(
                "pipewright.operators.Sum",
                PluginFactory::operator(|_| Ok(Box::new(SumOperator))),
            )
            .with(
                "pipewright.operators.Show",
                PluginFactory::operator(|params| Ok(Box::new(ShowOperator::from_params(params)?))),
            )
            .with(
                "pipewright.operators.SaveJson",
                PluginFactory::operator(|params| {
                    Ok(Box::new(SaveJsonOperator::from_params(params)?))
                }),
            )
            .with(
                "pipewright.sources.Inline",
                PluginFactory::datasource(|params| Ok(Box::new(InlineSource::from_params(params)))),
            )
            .with(
                "pipewright.sources.JsonFile",
                PluginFactory::datasource(|params| {
                    Ok(Box::new(JsonFileSource::from_params(params)?))
                }),
            )
            .with(
                "pipewright.schedulers.Interval",
                PluginFactory::scheduler(|config, path| {
                    Ok(Box::new(IntervalScheduler::from_config(config, path)?))
                }),
            )
            .with(
                "pipewright.triggers.LocalFile",
                PluginFactory::trigger(|config, path| {
                    Ok(Box::new(LocalFileTrigger::from_config(config, path)?))
                }),
            )
    }

    /// Add (or replace) the plugin at `path`
    pub fn with(mut self, path: impl Into<String>, factory: PluginFactory) -> Self {
        self.entries.insert(path.into(), factory);
        self
    }

    /// Look up `path`, requiring it to be a plugin of `kind`
    pub fn lookup(&self, kind: PluginKind, path: &str) -> PipewrightResult<&PluginFactory> {
        self.entries
            .get(path)
            .filter(|factory| factory.kind() == kind)
            .ok_or_else(|| PipewrightError::ExtensionNotFound {
                kind,
                path: path.to_string(),
            })
    }

    /// Resolve `path` and register it into `registry` under its bare name
    pub fn install(
        &self,
        kind: PluginKind,
        path: &str,
        registry: &mut Registry,
    ) -> PipewrightResult<String> {
        let factory = self.lookup(kind, path)?.clone();
        let name = bare_name(path).to_string();
        registry.register(name.clone(), factory);
        Ok(name)
    }

    /// All catalog paths of `kind`, sorted
    pub fn paths(&self, kind: PluginKind) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, factory)| factory.kind() == kind)
            .map(|(path, _)| path.as_str())
            .collect()
    }
}

/// Last segment of a dotted path
pub fn bare_name(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}
