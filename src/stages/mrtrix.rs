// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! MRtrix3 stages
//!
//! Diffusion gradients are passed FSL-style as a `(bvec, bval)` pair of
//! file ports on every stage that needs them.

use crate::graph::{PortType, StageNode};

fn with_gradients(node: StageNode) -> StageNode {
    node.input("in_bvec", PortType::File)
        .input("in_bval", PortType::File)
}

/// `dwibiascorrect`
pub fn dwibiascorrect(name: &str) -> StageNode {
    with_gradients(StageNode::command(name, "dwibiascorrect").input("in_file", PortType::File))
        .output("out_file", PortType::File)
        .param("algorithm", "fsl")
}

/// `dwiextract -bzero`
pub fn dwiextract_b0(name: &str) -> StageNode {
    with_gradients(StageNode::command(name, "dwiextract").input("in_file", PortType::File))
        .output("out_file", PortType::File)
        .param("bzero", true)
}

/// `dwiextract -shells`, exporting the gradients of the extracted volumes
pub fn dwiextract_shells(name: &str, shells: &[u32]) -> StageNode {
    let shells: Vec<i64> = shells.iter().map(|&b| i64::from(b)).collect();
    with_gradients(StageNode::command(name, "dwiextract").input("in_file", PortType::File))
        .output("out_file", PortType::File)
        .output("out_bvec", PortType::File)
        .output("out_bval", PortType::File)
        .param("shell", shells)
}

/// `mrmath mean` along the volume axis
pub fn mrmath_mean(name: &str) -> StageNode {
    StageNode::command(name, "mrmath")
        .input("in_file", PortType::File)
        .output("out_file", PortType::File)
        .param("operation", "mean")
        .param("axis", 3_i64)
}

/// `5ttgen`
pub fn gen5tt(name: &str, algorithm: &str) -> StageNode {
    StageNode::command(name, "5ttgen")
        .input("in_file", PortType::File)
        .output("out_file", PortType::File)
        .param("algorithm", algorithm)
        .param("out_file", "5TT.mif")
}

/// `5tt2gmwmi`
pub fn gen5tt2gmwmi(name: &str) -> StageNode {
    StageNode::command(name, "5tt2gmwmi")
        .input("in_file", PortType::File)
        .output("out_file", PortType::File)
        .param("out_file", "gmwmi.mif")
}

/// `dwi2response` algorithms this crate can wire
pub const RESPONSE_ALGORITHMS: &[&str] = &["dhollander", "fa", "msmt_5tt", "tax", "tournier"];

/// `dwi2fod` algorithms this crate can wire
pub const FOD_ALGORITHMS: &[&str] = &["csd", "msmt_csd"];

/// Whether a `dwi2response` algorithm estimates GM and CSF responses too
pub fn is_multi_tissue_response(algorithm: &str) -> bool {
    matches!(algorithm, "dhollander" | "msmt_5tt")
}

/// Whether a `dwi2fod` algorithm reads GM and CSF responses
pub fn is_multi_tissue_fod(algorithm: &str) -> bool {
    algorithm == "msmt_csd"
}

/// `dwi2response`
///
/// `msmt_5tt` reads the tissue segmentation through `mtt_file`. Multi-tissue
/// algorithms add `gm_file` and `csf_file` to the white-matter response.
pub fn dwi2response(name: &str, algorithm: &str) -> StageNode {
    let mut node = with_gradients(StageNode::command(name, "dwi2response").input("in_file", PortType::File))
        .optional_input("in_mask", PortType::File)
        .output("wm_file", PortType::File);

    if algorithm == "msmt_5tt" {
        node = node.input("mtt_file", PortType::File);
    }
    if is_multi_tissue_response(algorithm) {
        node = node
            .output("gm_file", PortType::File)
            .output("csf_file", PortType::File);
    }

    node.param("algorithm", algorithm)
}

/// `dwi2fod`
///
/// `msmt_csd` takes one response per tissue and writes one ODF per tissue.
pub fn dwi2fod(name: &str, algorithm: &str) -> StageNode {
    let mut node = with_gradients(StageNode::command(name, "dwi2fod").input("in_file", PortType::File))
        .input("wm_txt", PortType::File)
        .input("mask_file", PortType::File)
        .output("wm_odf", PortType::File);

    if is_multi_tissue_fod(algorithm) {
        node = node
            .input("gm_txt", PortType::File)
            .input("csf_txt", PortType::File)
            .output("gm_odf", PortType::File)
            .output("csf_odf", PortType::File)
            .param("gm_odf", "GM.mif")
            .param("csf_odf", "CSF.mif");
    }

    node.param("algorithm", algorithm).param("wm_odf", "FOD.mif")
}

/// `tckgen` with anatomically constrained tracking seeded from the GM/WM interface
pub fn tckgen(name: &str, cutoff: Option<f64>) -> StageNode {
    let node = StageNode::command(name, "tckgen")
        .input("in_file", PortType::File)
        .input("act_file", PortType::File)
        .input("seed_gmwmi", PortType::File)
        .input("select", PortType::Integer)
        .output("out_file", PortType::File)
        .param("algorithm", "iFOD2");

    match cutoff {
        Some(cutoff) => node.param("cutoff", cutoff),
        None => node,
    }
}

/// `tcksift2`
pub fn tcksift2(name: &str) -> StageNode {
    StageNode::command(name, "tcksift2")
        .input("in_tracks", PortType::File)
        .input("in_fod", PortType::File)
        .output("out_weights", PortType::File)
        .param("out_weights", "prob_weights.txt")
}

/// Edge weighting of a connectome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectomeScale {
    /// Streamline count scaled by inverse length and inverse node volume
    InverseLength,
    /// Mean streamline length per edge
    Length,
}

/// `tck2connectome`
///
/// Streamline weights are only read by the inverse-length variant.
pub fn tck2connectome(name: &str, scale: ConnectomeScale, search_radius: f64) -> StageNode {
    let node = StageNode::command(name, "tck2connectome")
        .input("in_file", PortType::File)
        .input("in_parc", PortType::File)
        .output("out_file", PortType::File)
        .param("symmetric", true)
        .param("zero_diagonal", true)
        .param("search_radius", search_radius);

    match scale {
        ConnectomeScale::InverseLength => node
            .input("in_weights", PortType::File)
            .param("scale_invlength", true)
            .param("scale_invnodevol", true)
            .param("out_file", "conmat_invlength.csv"),
        ConnectomeScale::Length => node
            .param("scale_length", true)
            .param("stat_edge", "mean")
            .param("out_file", "conmat_length.csv"),
    }
}

/// `mrconvert` into the given file name
pub fn mrconvert(name: &str, out_filename: &str) -> StageNode {
    StageNode::command(name, "mrconvert")
        .input("in_file", PortType::File)
        .output("converted", PortType::File)
        .param("out_filename", out_filename)
}
