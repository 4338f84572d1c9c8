// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! # tractify - Tractography Pipeline Graphs
//!
//! `tractify` assembles the processing graph that turns an anatomical image
//! and preprocessed diffusion data into structural connectomes.
//!
//! ## Features
//!
//! - **Graph construction** - Typed ports, validated wiring, sealed immutable graphs
//! - **Segmentation variants** - FSL or FreeSurfer tissue segmentation
//! - **BIDS datasets** - Participant resolution and per-session batch builds
//! - **Gradient checks** - Detect hemispherical diffusion sampling
//! - **Provenance naming** - Deterministic output file names per subject/session
//!
//! ## Quick Start
//!
//! ```bash
//! # Build one subject's graph
//! tractify build T1w.nii.gz eddy.nii.gz dwi.bvec dwi.bval tpl.nii.gz atlas.nii.gz out/
//!
//! # Build every participant of a dataset
//! tractify batch bids/ derivatives/dmripreproc tpl.nii.gz atlas.nii.gz out/
//!
//! # Check that the external programs are installed
//! tractify tools
//! ```

pub mod cli;
pub mod dataset;
pub mod errors;
pub mod geometry;
pub mod graph;
pub mod settings;
pub mod stages;
pub mod utils;
pub mod workflow;

// Re-export commonly used types
pub use errors::{ErrorKind, TractifyError, TractifyResult};
pub use geometry::{is_hemispherical, GradientTable, Hemisphere};
pub use graph::{GraphBuilder, PipelineGraph, StageNode};
pub use settings::Settings;

// Re-export workflow types
pub use workflow::{
    OutputProvenanceNamer, OutputRole, PipelineGraphBuilder, SegmentationVariant, SessionDriver,
    TractInputs,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
