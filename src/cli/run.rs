// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Run command - register a pipeline and run the platform

use colored::Colorize;
use miette::Result;
use serde_json::Value;
use std::path::PathBuf;

use crate::pipeline::{ParamOverrides, RunResults};
use crate::platform::{Lifecycle, Platform, Registration};
use crate::registry::Catalog;
use crate::utils::{print_header, print_result};

/// Run the run command
pub async fn run(
    pipeline_path: PathBuf,
    config_path: PathBuf,
    params: Vec<String>,
    verbose: bool,
) -> Result<()> {
    let overrides = parse_overrides(&params)?;

    let mut platform = Platform::from_extensions(&config_path, &Catalog::builtin())
        .map_err(|e| miette::miette!("Failed to load extensions from {}: {}", config_path.display(), e))?
        .with_overrides(overrides);

    if verbose {
        eprintln!(
            "{} {} plugin(s) from {}",
            "Loaded".green(),
            platform.registry().len(),
            config_path.display()
        );
    }

    let registration = platform.register_pipeline(&pipeline_path).await?;
    report_registration(&registration);

    match platform.start().await? {
        Lifecycle::Idle => {
            if verbose {
                eprintln!("{}", "No active schedulers or triggers.".dimmed());
            }
        }
        Lifecycle::Interrupted => eprintln!("{}", "Interrupted; stopped.".yellow()),
        Lifecycle::ShutdownRequested => eprintln!("{}", "Stopped.".dimmed()),
    }

    Ok(())
}

fn report_registration(registration: &Registration) {
    let path = registration.path.display().to_string();

    if registration.scheduled {
        eprintln!("{} {}", "Scheduled".cyan(), path);
    }

    if let Some(binding) = &registration.event {
        let how = if binding.shared {
            "joined existing trigger"
        } else {
            "subscribed to trigger"
        };
        eprintln!("{} {} ({})", "Event".cyan(), path, how.dimmed());
    }

    if let Some(results) = &registration.results {
        print_results(&path, results);
    }
}

/// Print run results, one step per line, sorted by step id
fn print_results(path: &str, results: &RunResults) {
    print_header(&format!("Results for {path}"));

    let mut ids: Vec<&String> = results.keys().collect();
    ids.sort();
    for id in ids {
        print_result(id, &results[id]);
    }
}

/// Parse `KEY=VALUE` and `STEP.KEY=VALUE` arguments.
///
/// Values are read as YAML scalars, so `3` is a number and `true` a boolean;
/// anything that does not parse is kept as a string.
pub fn parse_overrides(params: &[String]) -> Result<ParamOverrides> {
    let mut overrides = ParamOverrides::new();

    for param in params {
        let (target, raw) = param
            .split_once('=')
            .ok_or_else(|| miette::miette!("Invalid parameter '{}': expected KEY=VALUE", param))?;

        let value = parse_value(raw);
        match target.split_once('.') {
            Some((step, key)) if !step.is_empty() && !key.is_empty() => {
                overrides.set_for_step(step, key, value);
            }
            None if !target.is_empty() => {
                overrides.set(target, value);
            }
            _ => {
                return Err(miette::miette!(
                    "Invalid parameter '{}': expected KEY=VALUE or STEP.KEY=VALUE",
                    param
                ))
            }
        }
    }

    Ok(overrides)
}

fn parse_value(raw: &str) -> Value {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(value @ (Value::Bool(_) | Value::Number(_) | Value::Null)) if !raw.trim().is_empty() => value,
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::Params;
    use serde_json::json;

    fn params(pairs: &[(&str, Value)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_parse_overrides() {
        let overrides = parse_overrides(&[
            "value=3".to_string(),
            "a.value=10".to_string(),
            "load.file_path=in/x.csv".to_string(),
        ])
        .unwrap();

        let declared = params(&[("value", json!(0))]);
        assert_eq!(overrides.apply("a", &declared)["value"], json!(10));
        assert_eq!(overrides.apply("b", &declared)["value"], json!(3));

        let declared = params(&[("file_path", json!(""))]);
        assert_eq!(overrides.apply("load", &declared)["file_path"], json!("in/x.csv"));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("3"), json!(3));
        assert_eq!(parse_value("2.5"), json!(2.5));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("hello"), json!("hello"));
        assert_eq!(parse_value("[1, 2]"), json!("[1, 2]"));
        assert_eq!(parse_value(""), json!(""));
    }

    #[test]
    fn test_parse_overrides_rejects_malformed() {
        assert!(parse_overrides(&["novalue".to_string()]).is_err());
        assert!(parse_overrides(&["=3".to_string()]).is_err());
        assert!(parse_overrides(&[".key=3".to_string()]).is_err());
    }
}
