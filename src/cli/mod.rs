// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for pipewright.

pub mod plugins;
pub mod run;
pub mod validate;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default extensions document
pub const DEFAULT_CONFIG: &str = "config.yaml";

/// Plugin-based data pipeline runner
#[derive(Parser, Debug)]
#[clap(
    name = "pipewright",
    version,
    about = "Run YAML-declared data pipelines on demand, on a timer, or on events",
    long_about = None,
    after_help = "Examples:\n\
        pipewright run pipeline.yaml                   Register and run a pipeline\n\
        pipewright run p.yaml -p load.file_path=x.csv  Override a step parameter\n\
        pipewright validate pipeline.yaml              Check a pipeline without running it\n\
        pipewright plugins                             List registered plugins\n\n\
        See 'pipewright <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Show info-level logs
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a pipeline and run the platform
    Run {
        /// Pipeline document
        pipeline: PathBuf,

        /// Extensions document listing the plugins to load
        #[clap(short, long, default_value = DEFAULT_CONFIG, env = "PIPEWRIGHT_CONFIG")]
        config: PathBuf,

        /// Parameter override, as KEY=VALUE or STEP.KEY=VALUE (repeatable).
        /// The text before the first '.' always names a step, so a global
        /// param whose name contains '.' cannot be overridden here
        #[clap(short, long = "param", value_name = "[STEP.]KEY=VALUE")]
        params: Vec<String>,
    },

    /// Validate a pipeline document without running it
    Validate {
        /// Pipeline document
        pipeline: PathBuf,

        /// Also check plugin names against this extensions document
        #[clap(short, long)]
        config: Option<PathBuf>,
    },

    /// List the plugins an extensions document registers
    Plugins {
        /// Extensions document
        #[clap(short, long, default_value = DEFAULT_CONFIG, env = "PIPEWRIGHT_CONFIG")]
        config: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "pipewright",
            "-v",
            "run",
            "p.yaml",
            "-p",
            "value=3",
            "--param",
            "a.value=10",
        ]);

        assert!(cli.verbose);
        match cli.command {
            Commands::Run {
                pipeline,
                config,
                params,
            } => {
                assert_eq!(pipeline, PathBuf::from("p.yaml"));
                assert_eq!(config, PathBuf::from(DEFAULT_CONFIG));
                assert_eq!(params, vec!["value=3", "a.value=10"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_validate_without_config() {
        let cli = Cli::parse_from(["pipewright", "validate", "p.yaml"]);
        assert!(matches!(cli.command, Commands::Validate { config: None, .. }));
    }

    #[test]
    fn test_param_help_explains_dotted_keys() {
        use clap::CommandFactory;

        let cli = Cli::command();
        let run = cli.find_subcommand("run").unwrap();
        let param = run
            .get_arguments()
            .find(|arg| arg.get_id() == "params")
            .unwrap();
        let help = param.get_help().unwrap().to_string();
        assert!(help.contains("always names a step"), "{help}");
    }
}
