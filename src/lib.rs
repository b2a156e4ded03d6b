// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! # pipewright - Plugin-based Data Pipelines
//!
//! `pipewright` runs data pipelines declared in YAML. Each step is an operator
//! or a data source looked up by name in a plugin registry; a pipeline runs
//! once on registration, on a scheduler's timer, or whenever an event trigger
//! fires.
//!
//! ## Features
//!
//! - **Plugin registry** - Operators, data sources, schedulers and triggers by name
//! - **Declaration-order runner** - Steps feed each other through `depends_on`
//! - **Parameter overrides** - Global or scoped to a single step
//! - **Shared triggers** - Identical `event` blocks share one trigger instance
//!
//! ## Quick Start
//!
//! ```bash
//! # Register and run a pipeline
//! pipewright run pipeline.yaml --config config.yaml
//!
//! # Override a step parameter
//! pipewright run pipeline.yaml -p load.file_path=data/prices.csv
//!
//! # Check a pipeline without running it
//! pipewright validate pipeline.yaml
//! ```

pub mod cli;
pub mod errors;
pub mod pipeline;
pub mod platform;
pub mod plugins;
pub mod registry;
pub mod utils;

// Re-export commonly used types
pub use errors::{PipewrightError, PipewrightResult};
pub use pipeline::{ParamOverrides, PipelineDocument, PipelineRunner, RunResults, StepSpec};
pub use platform::{Lifecycle, Platform, ShutdownHandle};
pub use plugins::{DataSource, EventTrigger, Operator, Scheduler, StepInput};
pub use registry::{load_extensions, Catalog, PluginFactory, PluginKind, Registry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
