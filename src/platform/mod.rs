// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Platform coordinator
//!
//! Decides how each registered pipeline runs: on a scheduler's timer, when an
//! event trigger fires, or once, immediately, at registration. After
//! registration, [`Platform::start`] starts every timer and trigger and blocks
//! until shutdown.

mod events;
mod shutdown;

pub use events::{dedup_key, EventInstance, EventTable};
pub use shutdown::ShutdownHandle;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::errors::{PipewrightError, PipewrightResult};
use crate::pipeline::{
    run_file, EventSpec, ParamOverrides, PipelineDocument, PipelineRunner, RunResults,
    SchedulerSpec,
};
use crate::plugins::{Dispatcher, Scheduler, StepInput};
use crate::registry::{load_extensions, Catalog, Registry};

/// How [`Platform::start`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Nothing was scheduled or subscribed; returned without blocking
    Idle,
    /// Stopped by Ctrl-C
    Interrupted,
    /// Stopped through a [`ShutdownHandle`]
    ShutdownRequested,
}

/// Outcome of registering one pipeline document
#[derive(Debug, Clone)]
pub struct Registration {
    pub path: PathBuf,
    /// A scheduler was created for the pipeline
    pub scheduled: bool,
    /// The event trigger the pipeline subscribed to
    pub event: Option<EventBinding>,
    /// Results of the immediate run, for pipelines with no scheduler or event
    pub results: Option<RunResults>,
}

/// Subscription of a pipeline to an event trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBinding {
    pub key: String,
    /// Whether an existing trigger instance was reused
    pub shared: bool,
}

/// Owns the registry, the live schedulers and the shared trigger instances
pub struct Platform {
    registry: Arc<Registry>,
    overrides: ParamOverrides,
    schedulers: Vec<Box<dyn Scheduler>>,
    events: EventTable,
    shutdown: ShutdownHandle,
}

impl Platform {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
            overrides: ParamOverrides::default(),
            schedulers: Vec::new(),
            events: EventTable::new(),
            shutdown: ShutdownHandle::new(),
        }
    }

    /// Build a platform whose registry is loaded from an extensions document
    pub fn from_extensions(path: &Path, catalog: &Catalog) -> PipewrightResult<Self> {
        Ok(Self::new(load_extensions(path, catalog)?))
    }

    /// Overrides applied to every run this platform starts.
    ///
    /// Event-supplied overrides take precedence over these.
    pub fn with_overrides(mut self, overrides: ParamOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Handle that ends [`start`](Self::start) from elsewhere
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn scheduler_count(&self) -> usize {
        self.schedulers.len()
    }

    pub fn event_instance_count(&self) -> usize {
        self.events.len()
    }

    /// Register the pipeline document at `path`.
    ///
    /// A document declaring neither `scheduler` nor `event` runs right away
    /// and its failure is returned here.
    pub async fn register_pipeline(&mut self, path: impl AsRef<Path>) -> PipewrightResult<Registration> {
        let path = path.as_ref();
        let document = PipelineDocument::from_file(path)?;

        let mut registration = Registration {
            path: path.to_path_buf(),
            scheduled: false,
            event: None,
            results: None,
        };

        // Nothing is kept until every backend the document names resolves.
        let scheduler = match &document.scheduler {
            Some(spec) => Some(self.build_scheduler(spec, path)?),
            None => None,
        };

        if let Some(spec) = &document.event {
            registration.event = Some(self.subscribe_event(spec, path).await?);
        }

        if let (Some(scheduler), Some(spec)) = (scheduler, &document.scheduler) {
            info!(pipeline = %path.display(), scheduler = %spec.kind, "pipeline scheduled");
            self.schedulers.push(scheduler);
            registration.scheduled = true;
        }

        if !document.is_deferred() {
            info!(pipeline = %path.display(), "running pipeline");
            let results = PipelineRunner::from_document(Arc::clone(&self.registry), document)?
                .override_params(self.overrides.clone())
                .run()
                .await?;
            registration.results = Some(results);
        }

        Ok(registration)
    }

    fn build_scheduler(&self, spec: &SchedulerSpec, path: &Path) -> PipewrightResult<Box<dyn Scheduler>> {
        let factory = self
            .registry
            .scheduler(&spec.kind)
            .map_err(|_| PipewrightError::SchedulerNotRegistered {
                name: spec.kind.clone(),
            })?;

        let mut scheduler = factory(&spec.config, path)?;
        scheduler.register(self.dispatcher(path))?;
        Ok(scheduler)
    }

    /// Callable running the pipeline at `path` with no initial input
    fn dispatcher(&self, path: &Path) -> Dispatcher {
        let registry = Arc::clone(&self.registry);
        let overrides = self.overrides.clone();
        let pipeline = path.to_path_buf();

        Dispatcher::new(path, move || {
            let registry = Arc::clone(&registry);
            let overrides = overrides.clone();
            let pipeline = pipeline.clone();

            async move {
                match run_file(registry, &pipeline, StepInput::Absent, overrides).await {
                    Ok(results) => info!(
                        pipeline = %pipeline.display(),
                        steps = results.len(),
                        "scheduled run finished"
                    ),
                    Err(err) => error!(
                        pipeline = %pipeline.display(),
                        error = %err,
                        "scheduled run failed"
                    ),
                }
            }
        })
    }

    async fn subscribe_event(&mut self, spec: &EventSpec, path: &Path) -> PipewrightResult<EventBinding> {
        let key = dedup_key(spec);

        let shared = match self.events.get(&key) {
            Some(instance) => {
                debug!(key = %key, trigger = %instance.kind(), "reusing event trigger");
                instance.subscribe(path).await;
                true
            }
            None => {
                let factory = self
                    .registry
                    .trigger(&spec.kind)
                    .map_err(|_| PipewrightError::TriggerNotRegistered {
                        name: spec.kind.clone(),
                    })?;

                let trigger = factory(&spec.config, path)?;
                let instance = EventInstance::new(
                    spec.kind.clone(),
                    trigger,
                    Arc::clone(&self.registry),
                    self.overrides.clone(),
                );
                self.events.insert(key.clone(), instance).subscribe(path).await;
                false
            }
        };

        info!(
            pipeline = %path.display(),
            trigger = %spec.kind,
            shared,
            "pipeline subscribed to event"
        );
        Ok(EventBinding { key, shared })
    }

    /// Start every scheduler and trigger, then block until shutdown.
    ///
    /// Returns [`Lifecycle::Idle`] at once when nothing was scheduled or
    /// subscribed.
    pub async fn start(&mut self) -> PipewrightResult<Lifecycle> {
        if self.schedulers.is_empty() && self.events.is_empty() {
            info!("No active schedulers or triggers; shutting down");
            return Ok(Lifecycle::Idle);
        }

        if let Err(err) = self.start_all() {
            self.stop_all();
            return Err(err);
        }

        info!(
            schedulers = self.schedulers.len(),
            triggers = self.events.len(),
            "platform running; press Ctrl-C to stop"
        );

        let listener = self.shutdown.listen_for_ctrl_c();
        let outcome = self.shutdown.wait().await;
        listener.abort();

        match outcome {
            Lifecycle::Interrupted => warn!("interrupted; stopping schedulers and triggers"),
            _ => info!("shutdown requested; stopping schedulers and triggers"),
        }
        self.stop_all();

        Ok(outcome)
    }

    fn start_all(&mut self) -> PipewrightResult<()> {
        for scheduler in &mut self.schedulers {
            scheduler.start()?;
        }
        self.events.start_all()?;
        Ok(())
    }

    fn stop_all(&mut self) {
        for scheduler in &mut self.schedulers {
            scheduler.stop();
        }
        self.events.stop_all();
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("registry", &self.registry)
            .field("schedulers", &self.schedulers.len())
            .field("event_instances", &self.events.len())
            .finish()
    }
}
