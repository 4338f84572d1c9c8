// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Batch command - build graphs for a whole dataset

use colored::Colorize;
use miette::Result;
use std::time::Instant;

use super::{fail, load_settings, write_graph_files, BatchArgs};
use crate::utils::{
    create_spinner, print_error, print_field, print_header, print_info, print_section,
    print_success, print_warning,
};
use crate::workflow::{
    BatchRequest, PipelineGraphBuilder, SegmentationVariant, SessionDriver, TOP_LEVEL_GRAPH,
};

/// Run the batch command
pub async fn run(batch: BatchArgs, dry_run: bool, verbose: bool) -> Result<()> {
    let settings = load_settings(batch.settings.as_deref())?;
    let variant: SegmentationVariant = batch.gen5tt_algo.parse().map_err(fail)?;

    let request = BatchRequest {
        bids_dir: batch.bids_dir,
        dmripreproc_dir: batch.dmripreproc_dir,
        template: batch.template_file,
        atlas: batch.atlas_file,
        output_dir: batch.output_dir,
        freesurfer_dir: batch.freesurfer_dir,
        variant,
        num_tracts: batch.num_tracts,
        participant_labels: batch.participant_label,
        strict: batch.strict,
        validate: !batch.skip_bids_validation,
    };
    let graph_dir = request.work_dir().join(TOP_LEVEL_GRAPH);

    print_header("Building tractography graphs");
    print_field("Dataset", request.bids_dir.display());
    print_field("Preprocessed", request.dmripreproc_dir.display());
    print_field("Algorithm", variant);
    println!();

    let start = Instant::now();
    // The spinner would interleave with debug logs
    let spinner = create_spinner("Scanning dataset and building graphs...", verbose);
    let driver = SessionDriver::new(PipelineGraphBuilder::new(settings));
    let outcome = driver.run(request).await;
    spinner.finish_and_clear();
    let outcome = outcome.map_err(fail)?;
    let elapsed = start.elapsed();

    print_section("Participants");
    for subject in &outcome.participants.participants {
        let sessions: Vec<&str> = outcome
            .sessions
            .iter()
            .filter(|(s, _)| s == subject)
            .map(|(_, session)| session.as_str())
            .collect();
        if sessions.is_empty() {
            print_warning(&format!("sub-{}: no sessions built", subject));
        } else {
            print_success(&format!("sub-{}: ses-{}", subject, sessions.join(", ses-")));
        }
    }
    for label in &outcome.participants.missing {
        print_warning(&format!("sub-{}: not found in dataset", label));
    }

    if !outcome.skipped.is_empty() {
        print_section("Skipped sessions");
        for skipped in &outcome.skipped {
            print_warning(&format!(
                "sub-{} ses-{}: {}",
                skipped.subject, skipped.session, skipped.reason
            ));
        }
    }

    if !outcome.failed.is_empty() {
        print_section("Failed participants");
        for failed in &outcome.failed {
            print_error(&format!("sub-{}: {}", failed.subject, failed.error));
            if verbose {
                crate::utils::print_recovery(&failed.error);
            }
        }
    }

    print_section("Summary");
    print_field("Sessions", outcome.sessions.len());
    print_field("Skipped", outcome.skipped.len());
    print_field("Failed", outcome.failed.len());
    print_field("Stages", outcome.graph.walk().len());
    print_field("Time", format!("{:.2}s", elapsed.as_secs_f64()));
    println!();

    if outcome.sessions.is_empty() {
        return Err(miette::miette!(
            "No sessions could be built\n\n\
             Check that preprocessing outputs exist under the dmripreproc directory."
        ));
    }

    if dry_run {
        print_info("Dry run: graph files not written");
    } else {
        for path in write_graph_files(&outcome.graph, &graph_dir).map_err(fail)? {
            print_success(&format!("Wrote {}", path.display()));
        }
    }

    println!();
    if outcome.is_complete() {
        println!("{}", "All sessions built successfully!".green().bold());
    } else {
        println!(
            "{}",
            "Graphs built with skipped or failed sessions.".yellow().bold()
        );
    }

    Ok(())
}
