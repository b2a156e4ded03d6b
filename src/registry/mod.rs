// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Plugin registry
//!
//! Maps a plugin kind and a bare name to a factory. A registry is filled once
//! at startup (usually by [`load_extensions`]) and then shared read-only
//! behind an `Arc` by every run, so concurrent lookups need no locking.

mod catalog;
mod extensions;

pub use catalog::Catalog;
pub use extensions::{load_extensions, ExtensionsDocument};

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{PipewrightError, PipewrightResult};
use crate::plugins::{DataSource, EventTrigger, Operator, Params, PluginResult, Scheduler};

/// The four plugin namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    Operator,
    DataSource,
    Scheduler,
    Trigger,
}

impl PluginKind {
    pub const ALL: [PluginKind; 4] = [
        PluginKind::Operator,
        PluginKind::DataSource,
        PluginKind::Scheduler,
        PluginKind::Trigger,
    ];

    /// Extensions document section listing plugins of this kind
    pub fn section(&self) -> &'static str {
        match self {
            Self::Operator => "operators",
            Self::DataSource => "datasources",
            Self::Scheduler => "schedulers",
            Self::Trigger => "triggers",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operator => write!(f, "Operator"),
            Self::DataSource => write!(f, "Datasource"),
            Self::Scheduler => write!(f, "Scheduler"),
            Self::Trigger => write!(f, "Trigger"),
        }
    }
}

/// Builds an operator from its effective params
pub type OperatorFactory = Arc<dyn Fn(&Params) -> PluginResult<Box<dyn Operator>> + Send + Sync>;

/// Builds a data source from its effective params
pub type DataSourceFactory =
    Arc<dyn Fn(&Params) -> PluginResult<Box<dyn DataSource>> + Send + Sync>;

/// Builds a scheduler from its config and the pipeline path it serves
pub type SchedulerFactory =
    Arc<dyn Fn(&Params, &Path) -> PluginResult<Box<dyn Scheduler>> + Send + Sync>;

/// Builds an event trigger from its config and the first pipeline path it serves
pub type TriggerFactory =
    Arc<dyn Fn(&Params, &Path) -> PluginResult<Box<dyn EventTrigger>> + Send + Sync>;

/// A constructible plugin of any kind
#[derive(Clone)]
pub enum PluginFactory {
    Operator(OperatorFactory),
    DataSource(DataSourceFactory),
    Scheduler(SchedulerFactory),
    Trigger(TriggerFactory),
}

impl PluginFactory {
    pub fn operator<F>(factory: F) -> Self
    where
        F: Fn(&Params) -> PluginResult<Box<dyn Operator>> + Send + Sync + 'static,
    {
        Self::Operator(Arc::new(factory))
    }

    pub fn datasource<F>(factory: F) -> Self
    where
        F: Fn(&Params) -> PluginResult<Box<dyn DataSource>> + Send + Sync + 'static,
    {
        Self::DataSource(Arc::new(factory))
    }

    pub fn scheduler<F>(factory: F) -> Self
    where
        F: Fn(&Params, &Path) -> PluginResult<Box<dyn Scheduler>> + Send + Sync + 'static,
    {
        Self::Scheduler(Arc::new(factory))
    }

    pub fn trigger<F>(factory: F) -> Self
    where
        F: Fn(&Params, &Path) -> PluginResult<Box<dyn EventTrigger>> + Send + Sync + 'static,
    {
        Self::Trigger(Arc::new(factory))
    }

    /// Namespace this factory belongs to
    pub fn kind(&self) -> PluginKind {
        match self {
            Self::Operator(_) => PluginKind::Operator,
            Self::DataSource(_) => PluginKind::DataSource,
            Self::Scheduler(_) => PluginKind::Scheduler,
            Self::Trigger(_) => PluginKind::Trigger,
        }
    }
}

impl fmt::Debug for PluginFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PluginFactory::{:?}", self.kind())
    }
}

/// One kind's name → factory table
struct Namespace<F> {
    kind: PluginKind,
    entries: HashMap<String, F>,
}

impl<F: Clone> Namespace<F> {
    fn new(kind: PluginKind) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
        }
    }

    fn insert(&mut self, name: String, factory: F) {
        if self.entries.insert(name.clone(), factory).is_some() {
            debug!(kind = %self.kind, name = %name, "replacing registered plugin");
        }
    }

    fn get(&self, name: &str) -> PipewrightResult<&F> {
        self.entries.get(name).ok_or_else(|| PipewrightError::NotFound {
            kind: self.kind,
            name: name.to_string(),
        })
    }

    fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Name → factory tables for all four plugin kinds
pub struct Registry {
    operators: Namespace<OperatorFactory>,
    datasources: Namespace<DataSourceFactory>,
    schedulers: Namespace<SchedulerFactory>,
    triggers: Namespace<TriggerFactory>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            operators: Namespace::new(PluginKind::Operator),
            datasources: Namespace::new(PluginKind::DataSource),
            schedulers: Namespace::new(PluginKind::Scheduler),
            triggers: Namespace::new(PluginKind::Trigger),
        }
    }

    /// Register a factory under `name`; a later registration of the same
    /// kind and name replaces the earlier one
    pub fn register(&mut self, name: impl Into<String>, factory: PluginFactory) {
        let name = name.into();
        match factory {
            PluginFactory::Operator(f) => self.operators.insert(name, f),
            PluginFactory::DataSource(f) => self.datasources.insert(name, f),
            PluginFactory::Scheduler(f) => self.schedulers.insert(name, f),
            PluginFactory::Trigger(f) => self.triggers.insert(name, f),
        }
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, name: impl Into<String>, factory: PluginFactory) -> Self {
        self.register(name, factory);
        self
    }

    /// Look up a factory of any kind
    pub fn resolve(&self, kind: PluginKind, name: &str) -> PipewrightResult<PluginFactory> {
        Ok(match kind {
            PluginKind::Operator => PluginFactory::Operator(Arc::clone(self.operators.get(name)?)),
            PluginKind::DataSource => {
                PluginFactory::DataSource(Arc::clone(self.datasources.get(name)?))
            }
            PluginKind::Scheduler => {
                PluginFactory::Scheduler(Arc::clone(self.schedulers.get(name)?))
            }
            PluginKind::Trigger => PluginFactory::Trigger(Arc::clone(self.triggers.get(name)?)),
        })
    }

    pub fn operator(&self, name: &str) -> PipewrightResult<&OperatorFactory> {
        self.operators.get(name)
    }

    pub fn datasource(&self, name: &str) -> PipewrightResult<&DataSourceFactory> {
        self.datasources.get(name)
    }

    pub fn scheduler(&self, name: &str) -> PipewrightResult<&SchedulerFactory> {
        self.schedulers.get(name)
    }

    pub fn trigger(&self, name: &str) -> PipewrightResult<&TriggerFactory> {
        self.triggers.get(name)
    }

    /// Whether a plugin of `kind` is registered under `name`
    pub fn contains(&self, kind: PluginKind, name: &str) -> bool {
        match kind {
            PluginKind::Operator => self.operators.entries.contains_key(name),
            PluginKind::DataSource => self.datasources.entries.contains_key(name),
            PluginKind::Scheduler => self.schedulers.entries.contains_key(name),
            PluginKind::Trigger => self.triggers.entries.contains_key(name),
        }
    }

    /// Registered names of `kind`, sorted
    pub fn names(&self, kind: PluginKind) -> Vec<&str> {
        match kind {
            PluginKind::Operator => self.operators.names(),
            PluginKind::DataSource => self.datasources.names(),
            PluginKind::Scheduler => self.schedulers.names(),
            PluginKind::Trigger => self.triggers.names(),
        }
    }

    /// Total number of registered plugins
    pub fn len(&self) -> usize {
        PluginKind::ALL.iter().map(|k| self.names(*k).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("operators", &self.operators.names())
            .field("datasources", &self.datasources.names())
            .field("schedulers", &self.schedulers.names())
            .field("triggers", &self.triggers.names())
            .finish()
    }
}
