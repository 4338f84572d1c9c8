// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Terminal reporting
//!
//! Consistent status lines for the CLI.

use colored::Colorize;

use crate::errors::TractifyError;

/// Print a styled header
pub fn print_header(title: &str) {
    println!("{}", title.bold());
    println!("{}", "═".repeat(title.len().max(40)));
}

/// Print a styled section
pub fn print_section(title: &str) {
    println!();
    println!("{}:", title.bold());
}

/// Print a key/value line
pub fn print_field(key: &str, value: impl std::fmt::Display) {
    println!("  {:<14} {}", format!("{}:", key).dimmed(), value);
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    println!("  {} {}", "✗".red(), msg);
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠".yellow(), msg);
}

pub fn print_info(msg: &str) {
    println!("  {} {}", "→".blue(), msg);
}

/// Print the recovery suggestion for an error, if it has one
pub fn print_recovery(error: &TractifyError) {
    if let Some(suggestion) = error.recovery() {
        eprintln!();
        eprint!("{}", suggestion);
    }
}
