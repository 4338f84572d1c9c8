// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! tractify - Tractography Pipeline Graphs
//!
//! Build and validate diffusion MRI tractography graphs for BIDS datasets.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tractify::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "tractify=debug"
    } else {
        "tractify=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
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
        Commands::Build { tract, dry_run } => {
            tractify::cli::build::run(tract, dry_run, cli.verbose).await
        }
        Commands::Graph { tract, format } => {
            tractify::cli::graph::run(tract, format, cli.verbose).await
        }
        Commands::Batch { batch, dry_run } => {
            tractify::cli::batch::run(batch, dry_run, cli.verbose).await
        }
        Commands::Participants {
            bids_dir,
            participant_label,
            strict,
            skip_bids_validation,
            format,
        } => {
            tractify::cli::participants::run(
                bids_dir,
                participant_label,
                strict,
                skip_bids_validation,
                format,
                cli.verbose,
            )
            .await
        }
        Commands::Gradients {
            bvec_file,
            bval_file,
            b0_threshold,
            format,
        } => {
            tractify::cli::gradients::run(bvec_file, bval_file, b0_threshold, format, cli.verbose)
                .await
        }
        Commands::Tools { gen5tt_algo } => tractify::cli::tools::run(gen5tt_algo, cli.verbose).await,
    }
}
