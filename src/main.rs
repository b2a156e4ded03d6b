// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! pipewright - Plugin-based Data Pipelines
//!
//! Run YAML-declared data pipelines on demand, on a timer, or on events.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pipewright::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG takes precedence over --verbose
    let default_level = if cli.verbose { "pipewright=info" } else { "pipewright=warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Run {
            pipeline,
            config,
            params,
        } => pipewright::cli::run::run(pipeline, config, params, cli.verbose).await,
        Commands::Validate { pipeline, config } => {
            pipewright::cli::validate::run(pipeline, config, cli.verbose).await
        }
        Commands::Plugins { config } => pipewright::cli::plugins::run(config, cli.verbose).await,
    }
}
