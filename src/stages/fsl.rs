// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! FSL stages
//!
//! Registration, skull stripping and tensor fitting.

use crate::graph::{PortType, StageNode};

/// Resampling of label images (segmentations, atlases) must not blend labels
const LABEL_INTERPOLATION: &str = "nearestneighbour";

/// `fslreorient2std`: reorient an image to the standard template orientation
pub fn reorient2std(name: &str) -> StageNode {
    StageNode::command(name, "fslreorient2std")
        .input("in_file", PortType::File)
        .output("out_file", PortType::File)
}

/// `bet`: brain extraction, optionally writing a binary mask
pub fn bet(name: &str, mask: bool) -> StageNode {
    let node = StageNode::command(name, "bet")
        .input("in_file", PortType::File)
        .output("out_file", PortType::File)
        .param("frac", 0.5);

    if mask {
        node.output("mask_file", PortType::File).param("mask", true)
    } else {
        node
    }
}

/// `flirt` estimating an affine from `in_file` onto `reference`
pub fn flirt_estimate(name: &str, dof: Option<u32>) -> StageNode {
    let node = StageNode::command(name, "flirt")
        .input("in_file", PortType::File)
        .input("reference", PortType::File)
        .output("out_file", PortType::File)
        .output("out_matrix_file", PortType::File);

    match dof {
        Some(dof) => node.param("dof", dof),
        None => node,
    }
}

/// `flirt -applyxfm`: resample a label image onto `reference` with a known matrix
pub fn flirt_apply(name: &str) -> StageNode {
    StageNode::command(name, "flirt")
        .input("in_file", PortType::File)
        .input("reference", PortType::File)
        .input("in_matrix_file", PortType::File)
        .output("out_file", PortType::File)
        .param("apply_xfm", true)
        .param("interp", LABEL_INTERPOLATION)
}

/// `convert_xfm -inverse`
pub fn convert_xfm_inverse(name: &str) -> StageNode {
    StageNode::command(name, "convert_xfm")
        .input("in_file", PortType::File)
        .output("out_file", PortType::File)
        .param("invert_xfm", true)
}

/// `convert_xfm -concat`: `in_file2` applied after `in_file`
pub fn convert_xfm_concat(name: &str) -> StageNode {
    StageNode::command(name, "convert_xfm")
        .input("in_file", PortType::File)
        .input("in_file2", PortType::File)
        .output("out_file", PortType::File)
        .param("concat_xfm", true)
}

/// `fnirt`: nonlinear registration initialised with an affine
pub fn fnirt(name: &str) -> StageNode {
    StageNode::command(name, "fnirt")
        .input("in_file", PortType::File)
        .input("ref_file", PortType::File)
        .input("affine_file", PortType::File)
        .output("fieldcoeff_file", PortType::File)
        .output("warped_file", PortType::File)
}

/// `invwarp`
pub fn invwarp(name: &str) -> StageNode {
    StageNode::command(name, "invwarp")
        .input("warp", PortType::File)
        .input("reference", PortType::File)
        .output("inverse_warp", PortType::File)
}

/// `applywarp` for a label image
pub fn applywarp(name: &str) -> StageNode {
    StageNode::command(name, "applywarp")
        .input("in_file", PortType::File)
        .input("ref_file", PortType::File)
        .input("field_file", PortType::File)
        .output("out_file", PortType::File)
        .param("interp", LABEL_INTERPOLATION)
}

/// `dtifit --sse`: tensor fit whose sum-of-squared-errors map is kept for QA
pub fn dtifit(name: &str) -> StageNode {
    StageNode::command(name, "dtifit")
        .input("dwi", PortType::File)
        .input("mask", PortType::File)
        .input("bvecs", PortType::File)
        .input("bvals", PortType::File)
        .output("fa", PortType::File)
        .output("md", PortType::File)
        .output("sse", PortType::File)
        .param("save_tensor", false)
        .param("sse", true)
}
