// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Gradients command - hemisphere check for a b-vector/b-value pair

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{fail, OutputFormat};
use crate::geometry::GradientTable;
use crate::utils::{print_field, print_header, print_section};

/// Run the gradients command
pub async fn run(
    bvec_file: PathBuf,
    bval_file: PathBuf,
    b0_threshold: f64,
    format: OutputFormat,
    _verbose: bool,
) -> Result<()> {
    let table = GradientTable::from_fsl_files(&bvec_file, &bval_file).map_err(fail)?;
    let hemisphere = table.hemisphere(b0_threshold).map_err(fail)?;

    match format {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "volumes": table.len(),
                "b0_volumes": table.b0_count(b0_threshold),
                "shells": table.shells(),
                "is_hemispherical": hemisphere.is_hemispherical,
                "pole": hemisphere.pole,
            });
            let output = serde_json::to_string_pretty(&report)
                .map_err(|e| miette::miette!("Failed to serialize report: {}", e))?;
            println!("{}", output);
        }
        OutputFormat::Text => {
            print_header("Gradient table");
            print_field("Volumes", table.len());
            print_field("b=0 volumes", table.b0_count(b0_threshold));
            print_field(
                "Shells",
                table
                    .shells()
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            );

            print_section("Hemisphere test");
            if hemisphere.is_hemispherical {
                let [x, y, z] = hemisphere.pole;
                println!(
                    "  {} Directions lie in one hemisphere",
                    "⚠".yellow()
                );
                print_field("Pole", format!("[{:.4}, {:.4}, {:.4}]", x, y, z));
            } else {
                println!("  {} Directions cover the full sphere", "✓".green());
            }
        }
    }

    Ok(())
}
