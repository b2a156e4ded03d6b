// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Terminal output helpers
//!
//! Consistent styling for CLI output. `colored` already honours `NO_COLOR`.

use colored::Colorize;
use serde_json::Value;

/// Print a styled header
pub fn print_header(title: &str) {
    println!("{}", title.bold());
    println!("{}", "═".repeat(title.chars().count().max(40)));
}

/// Print a styled section
pub fn print_section(title: &str) {
    println!();
    println!("{}:", title.bold());
}

/// Print a bullet point
pub fn print_bullet(content: &str) {
    println!("  • {}", content);
}

/// Print a success check
pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

/// Print an error cross
pub fn print_error(msg: &str) {
    println!("  {} {}", "✗".red(), msg);
}

/// Print a warning
pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠".yellow(), msg);
}

/// Print one step result as `id = value`
pub fn print_result(step: &str, value: &Value) {
    println!("  {} {} = {}", "✓".green(), step.bold(), format_value(value));
}

/// Compact JSON, shortened to one terminal line
pub fn format_value(value: &Value) -> String {
    const MAX: usize = 120;

    let rendered = value.to_string();
    if rendered.chars().count() <= MAX {
        return rendered;
    }
    let cut: String = rendered.chars().take(MAX - 1).collect();
    format!("{cut}…")
}
