// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Plugins command - list registered plugins

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::registry::{load_extensions, Catalog, PluginKind};
use crate::utils::{print_bullet, print_header, print_section};

/// Run the plugins command
pub async fn run(config_path: PathBuf, verbose: bool) -> Result<()> {
    let catalog = Catalog::builtin();
    let registry = load_extensions(&config_path, &catalog)?;

    print_header(&format!("Plugins registered by {}", config_path.display()));

    for kind in PluginKind::ALL {
        let names = registry.names(kind);
        print_section(&format!("{} ({})", kind.section(), names.len()));
        if names.is_empty() {
            println!("  {}", "none".dimmed());
        }
        for name in names {
            print_bullet(name);
        }
    }

    if verbose {
        print_section("Available extensions");
        for kind in PluginKind::ALL {
            for path in catalog.paths(kind) {
                println!("  {} {}", path.cyan(), format!("({kind})").dimmed());
            }
        }
    }

    println!();
    Ok(())
}
