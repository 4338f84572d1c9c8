// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Tissue segmentation variants
//!
//! The variant is chosen once from the `--gen5tt-algo` value and decides
//! which stages feed `5ttgen` and how the atlas reaches diffusion space.

use crate::errors::{TractifyError, TractifyResult};
use crate::graph::{GraphBuilder, INPUT_NODE};
use crate::stages::fsl;
use crate::stages::{freesurfer, mrtrix};

/// Node producing the five-tissue-type image
pub const GEN5TT_NODE: &str = "gen5tt";

/// Node producing the parcellation in diffusion space
pub const ATLAS_NODE: &str = "atlas_flirt";

/// How the five-tissue-type image is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentationVariant {
    /// Segment the registered T1w image with FSL
    Fsl,
    /// Resample an existing FreeSurfer aseg volume into diffusion space
    FreeSurfer,
}

impl std::str::FromStr for SegmentationVariant {
    type Err = TractifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fsl" => Ok(Self::Fsl),
            "freesurfer" => Ok(Self::FreeSurfer),
            other => Err(TractifyError::UnknownAlgorithm {
                choice: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for SegmentationVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SegmentationVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fsl => "fsl",
            Self::FreeSurfer => "freesurfer",
        }
    }

    /// Whether the variant reads a segmentation volume from `inputnode.fs_file`
    pub fn requires_segmentation_file(self) -> bool {
        matches!(self, Self::FreeSurfer)
    }

    /// Add `5ttgen` and whatever it reads from
    ///
    /// Expects `t1_flirt` (T1w registered to diffusion space) and `b0_mean`
    /// already in the graph.
    pub fn wire_segmentation(self, b: &mut GraphBuilder) -> TractifyResult<()> {
        match self {
            Self::Fsl => {
                b.add_node(
                    mrtrix::gen5tt(GEN5TT_NODE, "fsl")
                        .param("no_crop", true)
                        .param("premasked", true),
                )?;
                b.connect(("t1_flirt", "out_file"), (GEN5TT_NODE, "in_file"))
            }
            Self::FreeSurfer => {
                b.add_node(freesurfer::mri_convert("aseg_convert"))?;
                b.add_node(fsl::reorient2std("aseg_reorient"))?;
                b.add_node(fsl::flirt_apply("aseg_flirt"))?;
                b.add_node(mrtrix::gen5tt(GEN5TT_NODE, "freesurfer"))?;

                b.connect((INPUT_NODE, "fs_file"), ("aseg_convert", "in_file"))?;
                b.connect(("aseg_convert", "out_file"), ("aseg_reorient", "in_file"))?;
                b.connect(("aseg_reorient", "out_file"), ("aseg_flirt", "in_file"))?;
                b.connect(("b0_mean", "out_file"), ("aseg_flirt", "reference"))?;
                b.connect(("t1_flirt", "out_matrix_file"), ("aseg_flirt", "in_matrix_file"))?;
                b.connect(("aseg_flirt", "out_file"), (GEN5TT_NODE, "in_file"))
            }
        }
    }

    /// Bring `inputnode.atlas` into diffusion space as [`ATLAS_NODE`]
    ///
    /// Both variants start from an affine of the skull-stripped T1w
    /// (`t1_brain`) onto the template. The FreeSurfer variant refines it with
    /// a nonlinear warp, inverts it and resamples the atlas into T1w space
    /// before the final affine; the FSL variant composes the inverted affine
    /// with the T1w-to-diffusion affine.
    pub fn wire_atlas(self, b: &mut GraphBuilder) -> TractifyResult<()> {
        b.add_node(fsl::flirt_estimate("pre_atlas_flirt", None))?;
        b.connect(("t1_brain", "out_file"), ("pre_atlas_flirt", "in_file"))?;
        b.connect((INPUT_NODE, "template"), ("pre_atlas_flirt", "reference"))?;

        let atlas = fsl::flirt_apply(ATLAS_NODE);

        match self {
            Self::Fsl => {
                b.add_node(fsl::convert_xfm_inverse("xfm_inv"))?;
                b.add_node(fsl::convert_xfm_concat("xfm_concat"))?;
                b.add_node(atlas)?;

                b.connect(("pre_atlas_flirt", "out_matrix_file"), ("xfm_inv", "in_file"))?;
                b.connect(("xfm_inv", "out_file"), ("xfm_concat", "in_file"))?;
                b.connect(("t1_flirt", "out_matrix_file"), ("xfm_concat", "in_file2"))?;

                b.connect((INPUT_NODE, "atlas"), (ATLAS_NODE, "in_file"))?;
                b.connect(("xfm_concat", "out_file"), (ATLAS_NODE, "in_matrix_file"))?;
            }
            Self::FreeSurfer => {
                b.add_node(fsl::fnirt("atlas_fnirt"))?;
                b.add_node(fsl::invwarp("warp_inv"))?;
                b.add_node(fsl::applywarp("atlas_to_t1"))?;
                b.add_node(atlas)?;

                b.connect(("t1_brain", "out_file"), ("atlas_fnirt", "in_file"))?;
                b.connect((INPUT_NODE, "template"), ("atlas_fnirt", "ref_file"))?;
                b.connect(("pre_atlas_flirt", "out_matrix_file"), ("atlas_fnirt", "affine_file"))?;

                b.connect(("atlas_fnirt", "fieldcoeff_file"), ("warp_inv", "warp"))?;
                b.connect(("t1_brain", "out_file"), ("warp_inv", "reference"))?;

                b.connect((INPUT_NODE, "atlas"), ("atlas_to_t1", "in_file"))?;
                b.connect(("t1_brain", "out_file"), ("atlas_to_t1", "ref_file"))?;
                b.connect(("warp_inv", "inverse_warp"), ("atlas_to_t1", "field_file"))?;

                b.connect(("atlas_to_t1", "out_file"), (ATLAS_NODE, "in_file"))?;
                b.connect(("t1_flirt", "out_matrix_file"), (ATLAS_NODE, "in_matrix_file"))?;
            }
        }

        b.connect(("t1_flirt", "out_file"), (ATLAS_NODE, "reference"))
    }
}
