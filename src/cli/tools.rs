// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Tools command - check the external programs a graph needs

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::fail;
use crate::errors::RecoverySuggestion;
use crate::settings::Settings;
use crate::stages::{check_programs, required_programs};
use crate::workflow::{PipelineGraphBuilder, SegmentationVariant, TractInputs};

/// Run the tools command
pub async fn run(gen5tt_algo: String, verbose: bool) -> Result<()> {
    let variant: SegmentationVariant = gen5tt_algo.parse().map_err(fail)?;

    // Placeholder inputs; only the stage programs matter here
    let inputs = TractInputs {
        t1_file: PathBuf::from("T1w.nii.gz"),
        fs_file: variant
            .requires_segmentation_file()
            .then(|| PathBuf::from("aseg.mgz")),
        eddy_file: PathBuf::from("eddy_corrected.nii.gz"),
        bvec: PathBuf::from("dwi.bvec"),
        bval: PathBuf::from("dwi.bval"),
        template: PathBuf::from("template.nii.gz"),
        atlas: PathBuf::from("atlas.nii.gz"),
        output_dir: PathBuf::from("."),
    };
    let graph = PipelineGraphBuilder::new(Settings::default())
        .build_variant(variant, "001", "01", &inputs, 1)
        .map_err(fail)?;

    let programs = required_programs(&graph);
    let report = check_programs(&programs);

    println!("{} ({})", "External programs".bold(), variant);
    println!();
    for (program, path) in &report.found {
        if verbose {
            println!("  {} {} {}", "✓".green(), program, path.display().to_string().dimmed());
        } else {
            println!("  {} {}", "✓".green(), program);
        }
    }
    for program in &report.missing {
        println!("  {} {} {}", "✗".red(), program, "not found".dimmed());
    }
    println!();

    if report.all_found() {
        println!("{}", "All required programs are available!".green().bold());
        Ok(())
    } else {
        eprint!("{}", RecoverySuggestion::install_programs(&report.missing));
        Err(miette::miette!(
            "{} of {} required programs not found on PATH",
            report.missing.len(),
            programs.len()
        ))
    }
}
