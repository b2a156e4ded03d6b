// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Plugin capability traits
//!
//! Four closed capabilities make up a deployment: operators and data sources
//! produce step values, schedulers and event triggers decide when a pipeline
//! runs. Concrete implementations are looked up by name in the
//! [`Registry`](crate::registry::Registry); the built-in ones live in the
//! submodules.

mod operators;
mod schedulers;
mod sources;
mod triggers;

pub use operators::{ConstOperator, SaveJsonOperator, ShowOperator, SumOperator};
pub use schedulers::IntervalScheduler;
pub use sources::{InlineSource, JsonFileSource};
pub use triggers::LocalFileTrigger;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::pipeline::ParamOverrides;

/// Parameter and configuration mappings handed to plugin constructors
pub type Params = serde_json::Map<String, Value>;

/// Errors raised by plugin code, surfaced by the core as-is
pub type PluginError = anyhow::Error;

/// Result type for plugin code
pub type PluginResult<T> = Result<T, PluginError>;

/// Input handed to a step.
///
/// `Absent` is distinct from every real value, including JSON `null`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StepInput {
    /// No dependency and no externally supplied value
    #[default]
    Absent,
    /// Result of a single dependency, or an externally supplied value
    Single(Value),
    /// Results of several dependencies, in declaration order
    Many(Vec<Value>),
}

impl StepInput {
    /// Whether no input was supplied
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The single value, if this input carries exactly one
    pub fn as_single(&self) -> Option<&Value> {
        match self {
            Self::Single(v) => Some(v),
            _ => None,
        }
    }

    /// All carried values, in order
    pub fn values(&self) -> Vec<&Value> {
        match self {
            Self::Absent => vec![],
            Self::Single(v) => vec![v],
            Self::Many(vs) => vs.iter().collect(),
        }
    }

    /// Collapse into a plain JSON value (`Absent` becomes `null`)
    pub fn into_value(self) -> Value {
        match self {
            Self::Absent => Value::Null,
            Self::Single(v) => v,
            Self::Many(vs) => Value::Array(vs),
        }
    }
}

impl From<Value> for StepInput {
    fn from(value: Value) -> Self {
        Self::Single(value)
    }
}

impl From<Option<Value>> for StepInput {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Self::Absent, Self::Single)
    }
}

/// A transformation step
#[async_trait]
pub trait Operator: Send + Sync {
    /// Execute the step with its resolved input
    async fn run(&self, input: StepInput) -> PluginResult<Value>;
}

/// An entry-point step that takes no input
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Produce the step value
    async fn fetch(&self) -> PluginResult<Value>;
}

/// Timer backend bound to one pipeline document
pub trait Scheduler: Send {
    /// Hand over the callable that runs the bound pipeline
    fn register(&mut self, dispatcher: Dispatcher) -> PluginResult<()>;

    /// Start the underlying timer loop
    fn start(&mut self) -> PluginResult<()>;

    /// Stop the timer loop; in-flight runs finish on their own
    fn stop(&mut self) {}
}

/// External event source shared by every pipeline that declares it
pub trait EventTrigger: Send {
    /// Assign the callback fired whenever the external event occurs
    fn set_emitter(&mut self, emitter: Emitter);

    /// Begin listening
    fn start(&mut self) -> PluginResult<()>;

    /// Stop listening
    fn stop(&mut self) {}
}

/// Callable handed to schedulers; each call runs the bound pipeline once.
///
/// Failures of the run are logged by the dispatcher and never returned, so a
/// broken run cannot take down the scheduler's loop.
#[derive(Clone)]
pub struct Dispatcher {
    pipeline: PathBuf,
    run: Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>,
}

impl Dispatcher {
    /// Wrap a run closure for the pipeline at `pipeline`
    pub fn new<F, Fut>(pipeline: impl Into<PathBuf>, run: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            pipeline: pipeline.into(),
            run: Arc::new(move || run().boxed()),
        }
    }

    /// Path of the pipeline document this dispatcher runs
    pub fn pipeline(&self) -> &Path {
        &self.pipeline
    }

    /// Run the pipeline once
    pub fn dispatch(&self) -> BoxFuture<'static, ()> {
        (self.run)()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

/// Payload fired by an event trigger
#[derive(Debug, Clone, Default)]
pub struct Event {
    /// Initial input of every subscribed run
    pub payload: Value,
    /// Step-scoped parameter overrides for every subscribed run
    pub overrides: ParamOverrides,
}

impl Event {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            overrides: ParamOverrides::default(),
        }
    }

    /// Override `key` on step `step` for runs started by this event
    pub fn with_step_override(mut self, step: &str, key: &str, value: Value) -> Self {
        self.overrides.set_for_step(step, key, value);
        self
    }
}

/// Callback assigned to an event trigger; fans out to every subscriber
#[derive(Clone)]
pub struct Emitter {
    emit: Arc<dyn Fn(Event) -> BoxFuture<'static, ()> + Send + Sync>,
}

impl Emitter {
    pub fn new<F, Fut>(emit: F) -> Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            emit: Arc::new(move |event| emit(event).boxed()),
        }
    }

    /// Fire the event; resolves once every subscribed run has finished
    pub fn emit(&self, event: Event) -> BoxFuture<'static, ()> {
        (self.emit)(event)
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter").finish_non_exhaustive()
    }
}

/// Read a required parameter
pub fn required_param<T: DeserializeOwned>(params: &Params, key: &str) -> PluginResult<T> {
    let value = params
        .get(key)
        .ok_or_else(|| anyhow::anyhow!("missing required parameter '{}'", key))?;
    serde_json::from_value(value.clone())
        .map_err(|e| anyhow::anyhow!("invalid parameter '{}': {}", key, e))
}

/// Read an optional parameter, falling back to `default`
pub fn param_or<T: DeserializeOwned>(params: &Params, key: &str, default: T) -> PluginResult<T> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| anyhow::anyhow!("invalid parameter '{}': {}", key, e)),
    }
}
