// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Validate command - check a pipeline document

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::pipeline::{PipelineDocument, PipelineValidator, StepKind};
use crate::registry::{load_extensions, Catalog};
use crate::utils::{print_error, print_section, print_success, print_warning};

/// Run the validate command
pub async fn run(pipeline_path: PathBuf, config_path: Option<PathBuf>, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    let document = match PipelineDocument::from_file(&pipeline_path) {
        Ok(d) => d,
        Err(e) => {
            print_error("Failed to parse pipeline");
            println!();
            return Err(e.into());
        }
    };

    print_success("Pipeline file is valid YAML");

    let registry = match &config_path {
        Some(path) => {
            let registry = load_extensions(path, &Catalog::builtin())?;
            print_success(&format!(
                "Loaded {} plugin(s) from {}",
                registry.len(),
                path.display()
            ));
            Some(registry)
        }
        None => None,
    };

    let validation = PipelineValidator::validate(&document, registry.as_ref());

    if !validation.errors.is_empty() {
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            print_error(error);
        }
    }

    if !validation.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            print_warning(warning);
        }
    }

    if verbose {
        print_summary(&document);
    }

    println!();

    if !validation.is_valid() {
        return Err(miette::miette!("Pipeline validation failed"));
    }

    if validation.has_warnings() {
        println!("{}", "Pipeline is valid but has warnings.".yellow().bold());
    } else {
        println!("{}", "Pipeline is valid!".green().bold());
    }
    Ok(())
}

fn print_summary(document: &PipelineDocument) {
    print_section("Pipeline summary");

    let mode = match (&document.scheduler, &document.event) {
        (Some(s), Some(e)) => format!("scheduled ({}) and event ({})", s.kind, e.kind),
        (Some(s), None) => format!("scheduled ({})", s.kind),
        (None, Some(e)) => format!("event ({})", e.kind),
        (None, None) => "immediate".to_string(),
    };
    println!("  Mode: {}", mode);

    let Ok(steps) = document.steps() else {
        return;
    };
    println!("  Steps: {}", steps.len());
    for step in steps {
        let plugin = match step.kind() {
            Ok(StepKind::Operator(name)) => name.to_string(),
            Ok(StepKind::DataSource(name)) => format!("{name}, datasource"),
            Err(_) => "?".to_string(),
        };
        let deps = step
            .dependencies()
            .map(|d| format!(" [depends: {}]", d.ids().join(", ")))
            .unwrap_or_default();
        println!("    - {} ({}){}", step.id, plugin, deps.dimmed());
    }
}
