// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Tractography workflows
//!
//! Assembles the per-session tractography graph, names its final artifacts
//! and drives graph construction across a whole dataset.

mod outputs;
mod segmentation;
mod session;
mod tract;

pub use outputs::{OutputPlan, OutputProvenanceNamer, OutputRole};
pub use segmentation::{SegmentationVariant, ATLAS_NODE, GEN5TT_NODE};
pub use session::{
    BatchOutcome, BatchRequest, FailedSubject, SessionDriver, SkippedSession, SubjectGraph,
    DEFAULT_SESSION, TOP_LEVEL_GRAPH,
};
pub use tract::{
    freesurfer_subjects_dir, tract_graph_name, PipelineGraphBuilder, TractInputs, TRACT_INPUTS,
};
