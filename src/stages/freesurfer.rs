// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! FreeSurfer stages

use crate::graph::{PortType, StageNode};

/// `mri_convert` into NIfTI
pub fn mri_convert(name: &str) -> StageNode {
    StageNode::command(name, "mri_convert")
        .input("in_file", PortType::File)
        .output("out_file", PortType::File)
        .param("out_type", "niigz")
}
