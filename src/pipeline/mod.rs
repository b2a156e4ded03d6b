// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Pipeline documents and execution
//!
//! This module defines the pipeline document schema, the runtime parameter
//! overrides, the step runner, and static validation.

mod definition;
mod overrides;
mod runner;
mod validation;

pub use definition::*;
pub use overrides::ParamOverrides;
pub use runner::{run_file, PipelineRunner, RunResults};
pub use validation::{PipelineValidator, ValidationResult};
