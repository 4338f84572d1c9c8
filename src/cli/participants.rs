// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Participants command - show which subjects a batch run would process

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{fail, OutputFormat};
use crate::dataset::{BidsLayout, DatasetIndex, FileQuery, ParticipantResolver};

/// Run the participants command
pub async fn run(
    bids_dir: PathBuf,
    labels: Vec<String>,
    strict: bool,
    skip_bids_validation: bool,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let layout = BidsLayout::open(bids_dir, !skip_bids_validation).map_err(fail)?;
    let selection = ParticipantResolver::resolve(&layout, labels.as_slice(), strict).map_err(fail)?;

    match format {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "root": layout.root(),
                "participants": selection.participants,
                "missing": selection.missing,
            });
            let output = serde_json::to_string_pretty(&report)
                .map_err(|e| miette::miette!("Failed to serialize participants: {}", e))?;
            println!("{}", output);
        }
        OutputFormat::Text => {
            println!(
                "{} ({})",
                "Participants".bold(),
                layout.root().display().to_string().dimmed()
            );
            for subject in &selection.participants {
                if verbose {
                    let t1 = layout
                        .files(&FileQuery::new().subject(subject).suffix("T1w"))
                        .len();
                    println!("  {} sub-{} {}", "✓".green(), subject, format!("({} T1w)", t1).dimmed());
                } else {
                    println!("  {} sub-{}", "✓".green(), subject);
                }
            }
            for label in &selection.missing {
                println!("  {} sub-{} not found", "⚠".yellow(), label);
            }
        }
    }

    Ok(())
}
